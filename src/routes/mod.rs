//! HTTP endpoint implementations.
//!
//! - `ask`: the question-answering pipeline (embed, search, stream)
//! - `health`: liveness and readiness probes

pub mod ask;
pub mod health;

use crate::error::{AppError, AppResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (GET /).
pub async fn api_info() -> AppResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "ragrelay",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/ask",
            "/health",
            "/ready"
        ]
    })))
}

/// 404 fallback for undefined routes.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
