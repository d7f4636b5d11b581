// completion invoker - one deadline-bound call, no retry

use std::time::Duration;

use tracing::{debug, warn};

use super::api::CompletionProvider;
use crate::error::CompletionError;

/// run a single completion under `timeout`; provider errors pass through unchanged
pub async fn invoke(
    provider: &dyn CompletionProvider,
    prompt: &str,
    timeout: Duration,
) -> Result<String, CompletionError> {
    debug!(prompt_bytes = prompt.len(), ?timeout, "invoking llm");

    match tokio::time::timeout(timeout, provider.complete(prompt)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?timeout, "llm call exceeded its deadline");
            Err(CompletionError::Timeout(timeout))
        }
    }
}
