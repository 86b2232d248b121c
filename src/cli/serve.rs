//! `askgate serve` command handler.

use anyhow::{Context, Result};

use askgate::api::{self, AppState};
use askgate::config::Config;

use super::common::build_gateway;

/// Run the HTTP server until shutdown.
pub(crate) async fn cmd_serve(
    mut config: Config,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let gateway = build_gateway(&config)?;
    let state = AppState::new(gateway, &config);
    api::serve(&config, state)
        .await
        .with_context(|| format!("Server on {} failed", config.listen_addr()))
}
