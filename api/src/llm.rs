use std::time::Duration;

use serde::{Deserialize, Serialize};
use tcm_core::prompt::ConsultationPrompt;
use thiserror::Error;
use url::Url;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f32 = 0.3;

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL, always ending in `/` (e.g. `https://api.openai.com/v1/`)
    pub base_url: Url,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LlmConfigError {
    #[error("TCM_LLM_BASE_URL is not a valid URL (`{value}`): {source}")]
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("TCM_LLM_TIMEOUT_SECS must be a positive integer, got `{0}`")]
    InvalidTimeout(String),
}

impl LlmConfig {
    /// Read `TCM_LLM_*` variables. Returns `Ok(None)` when no base URL is set,
    /// which keeps the workflow in offline mode.
    pub fn from_env() -> Result<Option<Self>, LlmConfigError> {
        let Some(base) = std::env::var("TCM_LLM_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
        else {
            return Ok(None);
        };

        let timeout_secs = match std::env::var("TCM_LLM_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(LlmConfigError::InvalidTimeout(raw))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Some(Self {
            base_url: parse_base_url(&base)?,
            api_key: std::env::var("TCM_LLM_API_KEY")
                .ok()
                .filter(|v| !v.is_empty()),
            model: std::env::var("TCM_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }))
    }
}

/// Parse a base URL and make sure relative joins keep its path.
pub fn parse_base_url(raw: &str) -> Result<Url, LlmConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| LlmConfigError::InvalidBaseUrl {
        value: trimmed.to_string(),
        source,
    })
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to language model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("language model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("language model returned no completion text")]
    EmptyCompletion,
    #[error("invalid completions URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Text produced by the model for one consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Send the consultation prompt and return the first choice's text.
    pub async fn complete(&self, prompt: &ConsultationPrompt) -> Result<Completion, LlmError> {
        let url = self.config.base_url.join("chat/completions")?;
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: TEMPERATURE,
        };

        let mut request = self.http.post(url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let started = std::time::Instant::now();
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        tracing::info!(
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.chars().count(),
            "language model completion received"
        );

        Ok(Completion {
            text,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
