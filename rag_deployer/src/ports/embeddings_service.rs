use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::content_point::Embeddings;

/// Maps a text to a fixed-length vector
#[async_trait]
pub trait EmbeddingsService: Send + Sync {
    /// Length of every vector returned by `embed`
    fn dimensionality(&self) -> u64;

    async fn embed(&self, text: &str) -> Result<Embeddings, EmbeddingsServiceError>;
}

#[derive(thiserror::Error)]
pub enum EmbeddingsServiceError {
    #[error("No embeddings were generated for the given text")]
    NoEmbeddings,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl std::fmt::Debug for EmbeddingsServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
