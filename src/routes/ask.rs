//! The question-answering pipeline endpoint.
//!
//! `POST /api/ask` drives the three stages in sequence: embed the
//! question, retrieve the nearest chunks, then hand the assembled
//! prompt to the streaming relay. Any failure before the relay commits
//! maps to a structured JSON error; after commit the relay owns the
//! connection.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::prompt::build_prompt;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

/// Handle a question: validate, embed, search, assemble, stream.
pub async fn ask(
    State(state): State<AppState>,
    axum::Json(request): axum::Json<AskRequest>,
) -> AppResult<Response> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(AppError::BadRequest(
            "Missing or invalid question field".to_string(),
        ));
    }

    let embedding = state.embedder.embed(question).await?;

    let chunks = state.search.top_k(&embedding, state.config.top_k).await?;
    tracing::info!(retrieved = chunks.len(), "Retrieved grounding chunks");

    let messages = build_prompt(question, &chunks);

    // Last fallible stage before the response commits. From here on the
    // token stream owns all output to the caller.
    let tokens = state.generator.open_stream(&messages).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(tokens))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}
