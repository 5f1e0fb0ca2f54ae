//! Server initialization and routing.
//!
//! Router assembly, the middleware stack, and graceful shutdown. The
//! timeout layer bounds the pre-streaming phase of every request (it
//! applies until response headers are produced), so a live token stream
//! is never cut off by it.

use crate::config::AppConfig;
use crate::middleware::{log_requests, request_id};
use crate::routes::{api_info, ask, health, not_found};
use crate::state::AppState;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware.
///
/// No compression layer: it would buffer the incremental answer body
/// and defeat token-by-token delivery.
pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let timeout = TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.config.timeout());

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/api/ask", post(ask::ask))
        .fallback(not_found)
        .layer(timeout)
        .layer(cors)
        .layer(from_fn(request_id))
        .layer(from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// Connects the shared collaborators (chunk store, embedding and
/// generation clients), builds the router, and serves until SIGTERM or
/// Ctrl+C.
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting ragrelay on {} (top_k={}, dim={})",
        addr,
        config.top_k,
        config.embedding_dim
    );
    tracing::info!(
        "Embedding service: {}, provider: {}",
        config.embedding_url,
        config.generation_url
    );

    let state = AppState::connect(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
