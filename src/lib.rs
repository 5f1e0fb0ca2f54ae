//! ragrelay - retrieval-augmented question answering over HTTP.
//!
//! Accepts a natural-language question, embeds it via an external
//! embedding service, retrieves the nearest text chunks from a
//! pgvector-backed Postgres store, and streams a grounded LLM answer
//! token-by-token back to the caller.
//!
//! # Pipeline
//!
//! `POST /api/ask` → validate → embed → top-K similarity search →
//! prompt assembly → streaming relay. The three network stages fail
//! independently; anything that goes wrong before the answer stream
//! commits returns a structured JSON error, after which failures can
//! only truncate the stream.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ragrelay::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     ragrelay::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod embed;
pub mod error;
pub mod middleware;
pub mod prompt;
pub mod relay;
pub mod routes;
pub mod search;
pub mod server;
pub mod state;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use server::{build_router, start_server};
pub use state::AppState;
