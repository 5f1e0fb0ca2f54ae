//! Nearest-neighbor retrieval over the pgvector chunk store.

use async_trait::async_trait;
use pgvector::Vector;
use std::sync::Arc;

use crate::error::{AppError, AppResult};

/// Top-K nearest-neighbor search over stored chunk embeddings.
///
/// Implementations return at most `k` chunk texts in ascending distance
/// order. An empty result is valid. Read-only, single attempt.
#[async_trait]
pub trait ChunkSearch: Send + Sync {
    async fn top_k(&self, embedding: &[f32], k: i64) -> AppResult<Vec<String>>;
}

/// Chunk store backed by Postgres + pgvector.
///
/// Holds a single `tokio_postgres::Client`; the client pipelines
/// concurrent queries over one connection, so it is shared across
/// requests without per-request setup.
pub struct PgChunkStore {
    client: Arc<tokio_postgres::Client>,
    dim: usize,
}

impl PgChunkStore {
    pub fn new(client: Arc<tokio_postgres::Client>, dim: usize) -> Self {
        Self { client, dim }
    }

    /// Connect to the store and spawn the connection driver task.
    pub async fn connect(database_url: &str, dim: usize) -> AppResult<Self> {
        let (client, connection) =
            tokio_postgres::connect(database_url, tokio_postgres::NoTls).await?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "Postgres connection error");
            }
        });

        Ok(Self::new(Arc::new(client), dim))
    }
}

/// Contract precondition: the query vector must match the store's
/// declared dimensionality. Checked before any query is issued so a
/// malformed vector never reaches the store.
pub fn ensure_embedding_dim(got: usize, expected: usize) -> AppResult<()> {
    if got != expected {
        return Err(AppError::InvalidEmbeddingLength { got, expected });
    }
    Ok(())
}

const TOP_K_SQL: &str =
    "SELECT chunk FROM embeddings ORDER BY embedding <-> $1::vector LIMIT $2";

#[async_trait]
impl ChunkSearch for PgChunkStore {
    async fn top_k(&self, embedding: &[f32], k: i64) -> AppResult<Vec<String>> {
        ensure_embedding_dim(embedding.len(), self.dim)?;

        let vector = Vector::from(embedding.to_vec());
        let rows = self.client.query(TOP_K_SQL, &[&vector, &k]).await?;

        let mut chunks = Vec::with_capacity(rows.len());
        for row in rows {
            chunks.push(row.get::<_, String>("chunk"));
        }

        tracing::debug!(retrieved = chunks.len(), k, "Similarity search complete");

        Ok(chunks)
    }
}
