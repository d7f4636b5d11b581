// error types shared across the core crate

use std::time::Duration;

use thiserror::Error;

/// failures raised while building or running the token splitter
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(
        "invalid chunk configuration: chunk size {chunk_size} with overlap {chunk_overlap} (overlap must be smaller than a positive chunk size)"
    )]
    InvalidConfiguration {
        chunk_size: usize,
        chunk_overlap: usize,
    },

    #[error("tokenizer '{name}' is unavailable: {reason}")]
    TokenizerUnavailable { name: String, reason: String },
}

/// failures of a single llm completion call
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("llm call timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to reach llm provider: {0}")]
    Http(#[from] reqwest::Error),

    #[error("llm provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("llm provider returned an empty response")]
    EmptyResponse,

    #[error("{0} environment variable is not set")]
    MissingCredential(&'static str),
}

/// failures of the message generation loop
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to generate commit message: {0}")]
    Completion(#[from] CompletionError),

    #[error("maximum attempts reached ({0} passes without a decision)")]
    MaxAttemptsExceeded(u32),

    #[error("interactive prompt failed: {0}")]
    Interaction(String),
}

/// failures of the git collaborator
#[derive(Debug, Error)]
pub enum GitError {
    #[error("current directory is not a git repository")]
    NotARepository,

    #[error(transparent)]
    Git2(#[from] git2::Error),

    #[error("git {args} failed: {stderr}")]
    CommandFailed { args: String, stderr: String },

    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid tag name '{0}'")]
    InvalidTag(String),
}

/// failures while resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid llm api call timeout '{0}'")]
    InvalidTimeout(String),

    #[error("unknown provider '{0}' (expected openai, anthropic, ollama or openrouter)")]
    InvalidProvider(String),

    #[error(transparent)]
    Chunk(#[from] SplitError),
}

/// crate-level error surfaced by the flows
#[derive(Debug, Error)]
pub enum CommitterError {
    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("commit message is empty")]
    EmptyResult,

    #[error("no files or directories to process")]
    NoDocumentInputs,
}
