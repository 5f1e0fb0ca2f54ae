use std::sync::Arc;

use crate::config::AppConfig;
use crate::embed::{Embedder, HttpEmbedder};
use crate::error::AppResult;
use crate::relay::{Generator, HttpGenerator};
use crate::search::{ChunkSearch, PgChunkStore};

/// Shared application state.
///
/// Built once at startup and cloned per request. The three collaborators
/// sit behind trait objects so tests can swap in mocks; all of them are
/// concurrent-safe by construction (pooled HTTP clients, pipelined
/// Postgres client), so no request touches mutable shared state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Embedding service client
    pub embedder: Arc<dyn Embedder>,

    /// Chunk store similarity search
    pub search: Arc<dyn ChunkSearch>,

    /// Generation provider streaming client
    pub generator: Arc<dyn Generator>,
}

impl AppState {
    /// Build production state: connect to the chunk store and construct
    /// the outbound HTTP clients.
    pub async fn connect(config: AppConfig) -> AppResult<Self> {
        let embedder = HttpEmbedder::new(&config.embedding_url)?;
        let generator =
            HttpGenerator::new(&config.generation_url, &config.api_key, &config.model)?;
        let store = PgChunkStore::connect(&config.database_url, config.embedding_dim).await?;

        Ok(Self {
            config: Arc::new(config),
            embedder: Arc::new(embedder),
            search: Arc::new(store),
            generator: Arc::new(generator),
        })
    }

    /// Assemble state from pre-built collaborators. Used by tests to
    /// inject mocks.
    pub fn with_parts(
        config: AppConfig,
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn ChunkSearch>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            embedder,
            search,
            generator,
        }
    }
}
