//! Text-generation clients driving the summary composer.
//!
//! Every request pairs a fixed analyst system prompt with a user message made of the stage
//! instruction followed by the text to condense. Both adapters issue HTTP requests directly and
//! never retry.

use crate::config::{Config, GenerationProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// System prompt attached to every generation request.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are a senior financial analyst with over 20 years of experience in evaluating company financials, including 10-K reports and financial analyst reports. Your goal is to create comprehensive and concise summaries that are insightful and actionable for financial advisors. Ensure that the summary adheres to the specified format and includes all key details.";

/// Errors surfaced while generating text.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Provider was misconfigured or unreachable.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request passed to a generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Stage instruction or template placed ahead of the text.
    pub instruction: String,
    /// Text to summarize.
    pub text: String,
}

impl GenerationRequest {
    /// User message sent to the model: instruction, blank line, text.
    pub fn user_message(&self) -> String {
        format!("{}\n\n{}", self.instruction, self.text)
    }
}

/// Interface implemented by text-generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for the supplied instruction and text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError>;
}

/// Build a generation client based on configuration.
pub fn build_generation_client(
    config: &Config,
) -> Result<Arc<dyn GenerationClient>, GenerationClientError> {
    let client: Arc<dyn GenerationClient> = match config.generation_provider {
        GenerationProvider::OpenAI => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                GenerationClientError::ProviderUnavailable("OPENAI_API_KEY is not set".into())
            })?;
            Arc::new(OpenAiChatClient::new(
                config.openai_base_url.clone(),
                api_key,
                config.generation_model.clone(),
            )?)
        }
        GenerationProvider::Ollama => Arc::new(OllamaChatClient::new(
            config.ollama_url.clone(),
            config.generation_model.clone(),
        )?),
    };
    Ok(client)
}

fn build_http_client() -> Result<Client, GenerationClientError> {
    Client::builder()
        .user_agent("finsum/summary")
        .build()
        .map_err(|error| {
            GenerationClientError::ProviderUnavailable(format!(
                "failed to construct HTTP client: {error}"
            ))
        })
}

fn chat_messages(request: &GenerationRequest) -> serde_json::Value {
    json!([
        { "role": "system", "content": ANALYST_SYSTEM_PROMPT },
        { "role": "user", "content": request.user_message() },
    ])
}

/// Chat-completions client for OpenAI-compatible APIs.
pub struct OpenAiChatClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    /// Construct a client targeting `base_url` (for example `https://api.openai.com/v1`).
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
    ) -> Result<Self, GenerationClientError> {
        Ok(Self {
            http: build_http_client()?,
            base_url,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationClient for OpenAiChatClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        tracing::debug!(model = %self.model, chars = request.text.len(), "Generating summary");
        let payload = json!({
            "model": self.model,
            "messages": chat_messages(&request),
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationClientError::GenerationFailed(format!(
                "OpenAI returned {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode chat completion: {error}"
            ))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| GenerationClientError::InvalidResponse("completion had no content".into()))
    }
}

/// Chat client for the Ollama `/api/chat` endpoint.
pub struct OllamaChatClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaChatClient {
    /// Construct a client targeting the Ollama runtime at `base_url`.
    pub fn new(base_url: String, model: String) -> Result<Self, GenerationClientError> {
        Ok(Self {
            http: build_http_client()?,
            base_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
    done: bool,
}

#[async_trait]
impl GenerationClient for OllamaChatClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        let payload = json!({
            "model": self.model,
            "messages": chat_messages(&request),
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaChatResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(GenerationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        body.message
            .content
            .map(|content| content.trim().to_string())
            .ok_or_else(|| GenerationClientError::InvalidResponse("message had no content".into()))
    }
}
