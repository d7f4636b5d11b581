// llm provider clients - one json exchange per completion, no retries

use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Settings;
use crate::error::CompletionError;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

/// which backend answers completions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[value(name = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
    #[value(name = "openrouter")]
    OpenRouter,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Ollama => "ollama",
            Provider::OpenRouter => "openrouter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Provider::OpenAi),
            "anthropic" => Some(Provider::Anthropic),
            "ollama" => Some(Provider::Ollama),
            "openrouter" => Some(Provider::OpenRouter),
            _ => None,
        }
    }

    /// model used when none is configured
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::Anthropic => "claude-3-5-sonnet-latest",
            Provider::Ollama => "llama3.1",
            Provider::OpenRouter => "openai/gpt-4o",
        }
    }

    /// environment variable holding the api key, if the provider needs one
    pub fn credential_var(self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Ollama => None,
            Provider::OpenRouter => Some("OPENROUTER_API_KEY"),
        }
    }
}

/// the narrow interface the generation loop talks to
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// send one user prompt, return the model's text
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// build the configured provider, reading its credential through `env`
pub fn build_provider(
    settings: &Settings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn CompletionProvider>, CompletionError> {
    let api_key = match settings.provider.credential_var() {
        Some(var) => env(var)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(CompletionError::MissingCredential(var))?,
        None => String::new(),
    };

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    let model = settings.model.clone();

    debug!(provider = settings.provider.name(), model = %model, "initialised llm provider");

    Ok(match settings.provider {
        Provider::OpenAi => Box::new(ChatCompletions {
            http,
            base_url: settings.endpoints.openai.clone(),
            api_key,
            model,
        }),
        Provider::OpenRouter => Box::new(ChatCompletions {
            http,
            base_url: settings.endpoints.openrouter.clone(),
            api_key,
            model,
        }),
        Provider::Anthropic => Box::new(Anthropic {
            http,
            base_url: settings.endpoints.anthropic.clone(),
            api_key,
            model,
        }),
        Provider::Ollama => Box::new(Ollama {
            http,
            base_url: settings.endpoints.ollama.clone(),
            model,
        }),
    })
}

// openai-compatible chat completions (openai, openrouter)
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletions {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[async_trait]
impl CompletionProvider for ChatCompletions {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response: ChatResponse = send_json(
            self.http
                .post(endpoint(&self.base_url, "chat/completions"))
                .bearer_auth(&self.api_key)
                .json(&request),
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .and_then(non_empty)
            .ok_or(CompletionError::EmptyResponse)
    }
}

// anthropic messages api
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

pub struct Anthropic {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[async_trait]
impl CompletionProvider for Anthropic {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: ANTHROPIC_MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response: AnthropicResponse = send_json(
            self.http
                .post(endpoint(&self.base_url, "messages"))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request),
        )
        .await?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        non_empty(text).ok_or(CompletionError::EmptyResponse)
    }
}

// ollama chat api
#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: ResponseMessage,
}

pub struct Ollama {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[async_trait]
impl CompletionProvider for Ollama {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = OllamaRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response: OllamaResponse =
            send_json(self.http.post(endpoint(&self.base_url, "api/chat")).json(&request)).await?;

        response
            .message
            .content
            .and_then(non_empty)
            .ok_or(CompletionError::EmptyResponse)
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, CompletionError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(CompletionError::Api {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.json::<T>().await?)
}
