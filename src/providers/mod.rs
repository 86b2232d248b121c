//! Completion providers.
//!
//! The gateway only needs one thing from a language model: turn a prompt
//! into text. [`CompletionProvider`] is that seam; [`openai::OpenAIProvider`]
//! is the production implementation.

pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAIProvider;

/// Why a completion call failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No credential was configured at startup.
    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    /// 401 / 403 from the provider.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 429 from the provider.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// 5xx from the provider.
    #[error("server error: {0}")]
    ServerError(String),

    /// Other 4xx from the provider.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request never got a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// A 2xx response that could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// No answer within the configured deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Unknown(String),
}

/// Classify a non-success HTTP status from a provider.
pub fn parse_provider_error(status: u16, body: &str) -> ProviderError {
    let message = format!("HTTP {status}: {body}");
    match status {
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::RateLimit(message),
        400..=499 => ProviderError::InvalidRequest(message),
        500..=599 => ProviderError::ServerError(message),
        _ => ProviderError::Unknown(message),
    }
}

/// A black-box text completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Model identifier sent with every call.
    fn model(&self) -> &str;

    /// Complete `prompt` and return the model's text.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_error_auth() {
        assert!(matches!(
            parse_provider_error(401, "bad key"),
            ProviderError::Auth(m) if m.contains("bad key")
        ));
        assert!(matches!(
            parse_provider_error(403, ""),
            ProviderError::Auth(_)
        ));
    }

    #[test]
    fn test_parse_provider_error_rate_limit() {
        assert!(matches!(
            parse_provider_error(429, "slow down"),
            ProviderError::RateLimit(_)
        ));
    }

    #[test]
    fn test_parse_provider_error_client_and_server() {
        assert!(matches!(
            parse_provider_error(404, "no such model"),
            ProviderError::InvalidRequest(_)
        ));
        assert!(matches!(
            parse_provider_error(503, "overloaded"),
            ProviderError::ServerError(m) if m == "HTTP 503: overloaded"
        ));
        assert!(matches!(
            parse_provider_error(302, "moved"),
            ProviderError::Unknown(_)
        ));
    }

    #[test]
    fn test_timeout_reports_sub_second_deadline() {
        let err = ProviderError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "timed out after 250ms");
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(60)).to_string(),
            "timed out after 60s"
        );
    }

    #[tokio::test]
    async fn test_mock_provider_is_usable_as_trait_object() {
        let mut mock = MockCompletionProvider::new();
        mock.expect_complete()
            .returning(|prompt| Ok(format!("echo: {prompt}")));
        let provider: Box<dyn CompletionProvider> = Box::new(mock);
        assert_eq!(provider.complete("hi").await.unwrap(), "echo: hi");
    }
}
