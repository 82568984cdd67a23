//! HTTP surface for the chatbot pipeline.

mod handlers;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::chat::SharedChatPipeline;

/// Shared application state for HTTP handlers. Clients are built once at
/// startup and injected here; handlers hold no other state.
pub struct AppState {
    pub pipeline: SharedChatPipeline,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    pub const DEFAULT_PORT: u16 = 8080;

    const PORT_VARS: [&'static str; 2] = ["ALUMNI_PORT", "PORT"];

    pub fn from_env() -> Self {
        let port = Self::PORT_VARS
            .iter()
            .find_map(|key| env::var(key).ok())
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(Self::DEFAULT_PORT);
        Self { port }
    }
}

pub async fn run_server(pipeline: SharedChatPipeline, port: u16) -> anyhow::Result<()> {
    let state = Arc::new(AppState { pipeline });
    let app = handlers::router(state);

    let address = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {address}"))?;
    info!("Chatbot service listening on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
