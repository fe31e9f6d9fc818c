use std::collections::HashSet;

use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::{
    collection::{CollectionInfo, Distance},
    content_point::{ContentPoint, Embeddings},
    payload_filter::PayloadFilter,
    search_result::ScoredContentPoint,
};

/// Persists content points in named collections and searches them by similarity
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn list_collections(&self) -> Result<HashSet<String>, VectorStoreError>;

    async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
        distance: Distance,
    ) -> Result<(), VectorStoreError>;

    /// Inserts the points, overwriting any point with the same id.
    ///
    /// Returns once the store acknowledged the write.
    async fn upsert(
        &self,
        collection_name: &str,
        points: Vec<ContentPoint>,
    ) -> Result<(), VectorStoreError>;

    /// Returns at most `limit` points passing `filter`, best score first
    async fn search(
        &self,
        collection_name: &str,
        vector: Embeddings,
        limit: u64,
        filter: Option<PayloadFilter>,
    ) -> Result<Vec<ScoredContentPoint>, VectorStoreError>;

    async fn collection_info(
        &self,
        collection_name: &str,
    ) -> Result<CollectionInfo, VectorStoreError>;
}

#[derive(thiserror::Error)]
pub enum VectorStoreError {
    #[error("Error from the vector store: {0}")]
    StoreError(String),

    #[error("Collection {0} was not found")]
    CollectionNotFound(String),

    #[error("Invalid collection configuration: {0}")]
    ConfigurationError(String),

    #[error("Invalid point: {0}")]
    InvalidPoint(String),
}

impl std::fmt::Debug for VectorStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
