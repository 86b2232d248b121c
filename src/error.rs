//! Error types for askgate.
//!
//! [`AskGateError`] is the crate-wide error. The gateway only ever surfaces
//! two of its variants to HTTP callers (`QuotaExceeded` and `Provider`); the
//! rest are startup failures.

use thiserror::Error;

use crate::providers::ProviderError;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum AskGateError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller's daily quota is spent.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The completion provider failed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AskGateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_provider_error_converts() {
        let err: AskGateError = ProviderError::Timeout(Duration::from_secs(30)).into();
        assert!(matches!(err, AskGateError::Provider(ProviderError::Timeout(_))));
        assert!(err.to_string().starts_with("Provider error:"));
    }

    #[test]
    fn test_quota_exceeded_display() {
        let err = AskGateError::QuotaExceeded("alice:1.2.3.4 daily quota exceeded".into());
        assert_eq!(
            err.to_string(),
            "Quota exceeded: alice:1.2.3.4 daily quota exceeded"
        );
    }
}
