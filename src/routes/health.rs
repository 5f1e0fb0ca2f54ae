use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::time::SystemTime;

use crate::error::AppResult;
use crate::state::AppState;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check endpoint (liveness).
/// Returns 200 if the server is running.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "ragrelay",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
    }))
}

/// Readiness check endpoint.
/// Reports per-dependency status; the chunk store is actively probed.
pub async fn readiness_check(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let store_status = match ready_probe(&state).await {
        Ok(()) => "ready",
        Err(err) => {
            tracing::warn!(error = %err, "Chunk store readiness probe failed");
            "unavailable"
        }
    };

    Ok(Json(json!({
        "status": if store_status == "ready" { "ready" } else { "degraded" },
        "service": "ragrelay",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
        "components": {
            "api": "ready",
            "chunk_store": store_status,
        }
    })))
}

async fn ready_probe(state: &AppState) -> AppResult<()> {
    // Probe with a zero-result search; exercises the store connection
    // without depending on table contents.
    state
        .search
        .top_k(&vec![0.0; state.config.embedding_dim], 1)
        .await
        .map(|_| ())
}
