//! Axum API server for askgate.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::gateway::AnswerGateway;
use crate::quota::evictor::IdleKeyEvictor;
use crate::quota::SystemClock;

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AnswerGateway>,
    /// Charge quota to the first `X-Forwarded-For` hop instead of the peer.
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(gateway: AnswerGateway, config: &Config) -> Self {
        Self {
            gateway: Arc::new(gateway),
            trust_forwarded_for: config.server.trust_forwarded_for,
        }
    }
}

/// Build the axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    // Any origin, method and header.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(super::routes::root::index))
        .route("/favicon.ico", get(super::routes::root::favicon))
        .route("/api/main", post(super::routes::ask::ask))
        // Body size limit: 1 MiB.
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind the listener and serve until Ctrl-C / SIGTERM.
///
/// Also runs the idle-key evictor when `quota.evict_interval_secs > 0`.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let evictor = (config.quota.evict_interval_secs > 0).then(|| {
        let evictor = IdleKeyEvictor::new(
            Arc::clone(state.gateway.ledger()),
            Arc::new(SystemClock),
            Duration::from_secs(config.quota.evict_interval_secs),
        );
        tokio::spawn(evictor.run(shutdown_rx))
    });

    let app = build_router(state);
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("askgate listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = evictor {
        let _ = handle.await;
    }
    info!("askgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
