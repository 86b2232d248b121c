//! Helpers shared by command handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use askgate::config::Config;
use askgate::providers::CompletionProvider;
use askgate::{AnswerGateway, OpenAIProvider, QuotaLedger};

/// Build the gateway described by `config` with a fresh, empty ledger.
pub(crate) fn build_gateway(config: &Config) -> Result<AnswerGateway> {
    let provider = OpenAIProvider::from_config(&config.provider)
        .with_context(|| "Failed to build completion provider")?;
    if !provider.has_api_key() {
        warn!("OPENAI_API_KEY is not set; every question will fail with an AI service error");
    }
    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        "completion provider ready"
    );

    let timeout = (config.provider.timeout_secs > 0)
        .then(|| Duration::from_secs(config.provider.timeout_secs));

    Ok(
        AnswerGateway::new(Arc::new(QuotaLedger::new()), Arc::new(provider))
            .with_call_timeout(timeout),
    )
}
