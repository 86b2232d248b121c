//! OpenAI chat-completions provider.
//!
//! Sends the rendered prompt as a single user message with a fixed model and
//! temperature, and returns the first choice's message content.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{AskGateError, Result};

use super::{parse_provider_error, CompletionProvider, ProviderError};

/// OpenAI REST API base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Model used when none is configured.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature used when none is configured.
pub const DEFAULT_TEMPERATURE: f64 = 0.5;

pub struct OpenAIProvider {
    api_key: Option<String>,
    api_base: String,
    model: String,
    temperature: f64,
    timeout_secs: u64,
    client: Client,
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAIProvider {
    /// Build a provider from the `[provider]` config section.
    ///
    /// A missing API key is not an error here: the provider is still built
    /// and every [`CompletionProvider::complete`] call fails with
    /// [`ProviderError::MissingApiKey`].
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from);

        Ok(Self {
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            client: Self::build_client(config.timeout_secs)?,
        })
    }

    fn build_client(timeout_secs: u64) -> Result<Client> {
        let mut builder = Client::builder().connect_timeout(Duration::from_secs(10));
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        builder
            .build()
            .map_err(|e| AskGateError::Config(format!("failed to build HTTP client: {e}")))
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Chat-completions request body for a single prompt.
    pub fn build_request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        })
    }

    /// Extract the first choice's text from a chat-completions response.
    pub fn extract_text(response: &Value) -> Option<String> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        debug!("OpenAI request to model {}", self.model);

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(api_key)
            .json(&self.build_request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(Duration::from_secs(self.timeout_secs))
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        if response.status().is_success() {
            let json: Value = response.json().await.map_err(|e| {
                ProviderError::InvalidResponse(format!("failed to parse OpenAI response: {e}"))
            })?;

            return Self::extract_text(&json).ok_or_else(|| {
                ProviderError::InvalidResponse("response carried no message content".into())
            });
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();

        // OpenAI wraps errors as {"error": {"message": ...}}.
        let body_msg = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(error_text);

        Err(parse_provider_error(status, &body_msg))
    }
}
