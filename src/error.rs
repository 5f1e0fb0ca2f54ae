use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

/// Request-pipeline error taxonomy.
///
/// Every variant maps to a structured JSON body and a status code, but
/// only while the response is still uncommitted. Once the answer stream
/// has started, failures can no longer be surfaced this way (the 200 is
/// already on the wire) and are handled inside the relay instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Embedding service unavailable: {0}")]
    EmbedUnavailable(String),

    #[error("Embedding service returned an invalid response: {0}")]
    EmbedProtocol(String),

    #[error("Embedding length is {got}, expected {expected}")]
    InvalidEmbeddingLength { got: usize, expected: usize },

    #[error("Chunk store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Generation provider rejected the request ({status})")]
    ProviderRejected { status: StatusCode, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::EmbedUnavailable(_)
            | AppError::EmbedProtocol(_)
            | AppError::StoreUnavailable(_)
            | AppError::ProviderUnavailable(_)
            | AppError::ProviderRejected { .. } => StatusCode::BAD_GATEWAY,
            AppError::InvalidEmbeddingLength { .. }
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Extra detail carried alongside the message, if any.
    fn details(&self) -> Option<String> {
        match self {
            AppError::ProviderRejected { detail, .. } if !detail.is_empty() => {
                Some(detail.clone())
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        let body = match self.details() {
            Some(details) => json!({ "error": message, "details": details }),
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(err: std::net::AddrParseError) -> Self {
        AppError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {err}"))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
