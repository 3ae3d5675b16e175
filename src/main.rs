//! todos server.
//!
//! Startup order: `.env`, tracing, configuration, store, router, then the
//! HTTP listener with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use todos::api::{self, AppState};
use todos::config::{self, Config, LogSettings};
use todos::pages;
use todos::store::{AnyBackend, TaskStore};
use todos::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv()?;
    telemetry::init_tracing(&LogSettings::from_env())?;
    let cfg = Config::from_env();
    info!(version = env!("CARGO_PKG_VERSION"), "todos starting");

    let store = TaskStore::open(&cfg).await.context("opening task store")?;
    info!(timezone = %store.timezone(), "store ready");
    let state = Arc::new(AppState::new(store));

    let app = api::router::<AnyBackend>()
        .merge(pages::router::<AnyBackend>())
        .layer(TraceLayer::new_for_http())
        .layer(api::cors_layer(&cfg))
        .with_state(state);

    let addr: SocketAddr = cfg
        .bind_address
        .parse()
        .with_context(|| format!("invalid TODOS_BIND '{}'", cfg.bind_address))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("todos stopped");
    Ok(())
}

/// Resolves on SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
