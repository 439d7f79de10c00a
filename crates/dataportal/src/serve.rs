//! HTTP server: MCP on `/mcp`, liveness on `/health`.

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::mcp::{self, McpState};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
const SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

/// State for the health endpoint.
#[derive(Clone)]
pub struct HealthState {
    pub mcp: Arc<McpState>,
    pub start_time: Instant,
}

pub async fn handle_health(State(state): State<HealthState>) -> Json<Value> {
    let registry = state.mcp.gateway.registry();
    let sessions = state.mcp.sessions.stats();

    Json(json!({
        "status": "healthy",
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "providers": registry.prefixes(),
        "tools": registry.len(),
        "sessions": {
            "total": sessions.total,
            "in_flight": sessions.in_flight,
        },
    }))
}

/// The full application router.
pub fn app(state: Arc<McpState>) -> Router {
    let health = Router::new()
        .route("/health", get(handle_health))
        .with_state(HealthState {
            mcp: Arc::clone(&state),
            start_time: Instant::now(),
        });

    Router::new()
        .nest("/mcp", mcp::router(state))
        .merge(health)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until SIGINT or SIGTERM.
pub async fn run(state: Arc<McpState>, addr: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let cleanup = mcp::spawn_cleanup_task(
        Arc::clone(&state.sessions),
        CLEANUP_INTERVAL,
        SESSION_IDLE,
        cancel.clone(),
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("🇸🇪 dataportal ready!");
    info!("   MCP (Streamable): POST http://{}/mcp", addr);
    info!("   Health: GET http://{}/health", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    let _ = cleanup.await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let terminate = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
