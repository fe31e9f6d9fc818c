use std::sync::Arc;

use common::helper::error_chain_fmt;
use tracing::{error, info, warn};

use crate::{
    domain::entities::{
        collection::{CollectionInfo, Distance},
        content_point::{ContentPoint, ContentPointError, ContentPointPayload},
        payload_filter::PayloadFilter,
        record::{Record, RecordId},
        search_result::SearchResult,
    },
    ports::{
        embeddings_service::{EmbeddingsService, EmbeddingsServiceError},
        vector_store::{VectorStore, VectorStoreError},
    },
};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: u64 = 5;

/// Similarity metric of every collection created by the deployer
pub const COLLECTION_DISTANCE: Distance = Distance::Cosine;

/// Drives an embeddings service and a vector store to deploy and search records.
///
/// Errors from the services never leave the deployer: they are logged and turned into
/// `false`, an empty result, `None` or a skipped id in the `UploadReport`.
pub struct RagDeployer {
    embeddings_service: Arc<dyn EmbeddingsService>,
    vector_store: Arc<dyn VectorStore>,
    vector_size: u64,
}

/// Outcome of an upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    /// Number of records given to the upload
    pub total: usize,
    /// Number of points acknowledged by the store
    pub uploaded: usize,
    /// Number of upsert requests sent to the store
    pub batches: usize,
    /// Records that could not be turned into a point
    pub skipped_ids: Vec<RecordId>,
    /// Points part of a batch the store rejected
    pub failed_ids: Vec<RecordId>,
}

enum EnsureCollectionOutcome {
    AlreadyExists,
    Created,
}

impl RagDeployer {
    /// The embeddings dimensionality is read once here and used for every created collection
    pub fn new(
        embeddings_service: Arc<dyn EmbeddingsService>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        let vector_size = embeddings_service.dimensionality();

        Self {
            embeddings_service,
            vector_store,
            vector_size,
        }
    }

    pub fn vector_size(&self) -> u64 {
        self.vector_size
    }

    /// Creates the collection if it does not exist yet.
    ///
    /// Returns `false` if the store could not be queried or the creation failed.
    #[tracing::instrument(name = "Ensuring collection exists", skip(self))]
    pub async fn ensure_collection(&self, collection_name: &str) -> bool {
        match self.try_ensure_collection(collection_name).await {
            Ok(EnsureCollectionOutcome::AlreadyExists) => {
                info!("Collection '{}' already exists", collection_name);
                true
            }
            Ok(EnsureCollectionOutcome::Created) => {
                info!(
                    "Created collection '{}' with vector size {}",
                    collection_name, self.vector_size
                );
                true
            }
            Err(error) => {
                error!(?error, "Failed to create collection '{}'", collection_name);
                false
            }
        }
    }

    async fn try_ensure_collection(
        &self,
        collection_name: &str,
    ) -> Result<EnsureCollectionOutcome, VectorStoreError> {
        let existing_collections = self.vector_store.list_collections().await?;

        if existing_collections.contains(collection_name) {
            return Ok(EnsureCollectionOutcome::AlreadyExists);
        }

        self.vector_store
            .create_collection(collection_name, self.vector_size, COLLECTION_DISTANCE)
            .await?;

        Ok(EnsureCollectionOutcome::Created)
    }

    /// Embeds and upserts the records, `batch_size` points per request.
    ///
    /// A batch is flushed as soon as it is full, and the last partial batch after the
    /// final record. A record failing to be embedded or converted is skipped, a batch refused
    /// by the store is dropped: both are reported and the upload goes on.
    #[tracing::instrument(
        name = "Uploading records",
        skip(self, records),
        fields(total = records.len())
    )]
    pub async fn upload(
        &self,
        collection_name: &str,
        records: &[Record],
        batch_size: usize,
    ) -> UploadReport {
        let batch_size = batch_size.max(1);
        let mut report = UploadReport {
            total: records.len(),
            ..UploadReport::default()
        };
        let mut batch: Vec<ContentPoint> = Vec::with_capacity(batch_size);

        info!("Starting upload of {} records", report.total);

        for (index, record) in records.iter().enumerate() {
            match self.prepare_point(record).await {
                Ok(point) => batch.push(point),
                Err(error) => {
                    warn!(?error, record_id = record.id(), "Skipping record");
                    report.skipped_ids.push(record.id());
                }
            }

            if batch.len() >= batch_size {
                self.flush(collection_name, &mut batch, index + 1, &mut report)
                    .await;
            }
        }

        if !batch.is_empty() {
            self.flush(collection_name, &mut batch, records.len(), &mut report)
                .await;
        }

        info!(
            uploaded = report.uploaded,
            skipped = report.skipped_ids.len(),
            failed = report.failed_ids.len(),
            "Upload completed"
        );
        report
    }

    async fn prepare_point(&self, record: &Record) -> Result<ContentPoint, PreparePointError> {
        let payload = ContentPointPayload::try_from(record)?;
        let vector = self.embeddings_service.embed(&record.content).await?;

        if vector.len() as u64 != self.vector_size {
            return Err(PreparePointError::DimensionMismatch {
                expected: self.vector_size,
                actual: vector.len(),
            });
        }

        Ok(ContentPoint {
            id: record.id(),
            vector,
            payload,
        })
    }

    async fn flush(
        &self,
        collection_name: &str,
        batch: &mut Vec<ContentPoint>,
        processed: usize,
        report: &mut UploadReport,
    ) {
        let points = std::mem::take(batch);
        let ids: Vec<RecordId> = points.iter().map(|point| point.id).collect();
        report.batches += 1;

        match self.vector_store.upsert(collection_name, points).await {
            Ok(()) => {
                report.uploaded += ids.len();
                info!("Uploaded {}/{} records", processed, report.total);
            }
            Err(error) => {
                error!(?error, ?ids, "Failed to upsert batch of {} points", ids.len());
                report.failed_ids.extend(ids);
            }
        }
    }

    /// Searches the `limit` records closest to `query`, optionally restricted to a folder and/or topic.
    ///
    /// Returns an empty list on failure.
    #[tracing::instrument(name = "Searching records", skip(self))]
    pub async fn search(
        &self,
        collection_name: &str,
        query: &str,
        limit: u64,
        folder_filter: Option<&str>,
        topic_filter: Option<&str>,
    ) -> Vec<SearchResult> {
        let filter = PayloadFilter::from_labels(folder_filter, topic_filter);

        match self.try_search(collection_name, query, limit, filter).await {
            Ok(results) => results,
            Err(error) => {
                error!(?error, "Failed to search collection '{}'", collection_name);
                vec![]
            }
        }
    }

    async fn try_search(
        &self,
        collection_name: &str,
        query: &str,
        limit: u64,
        filter: Option<PayloadFilter>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let query_vector = self.embeddings_service.embed(query).await?;

        let points = self
            .vector_store
            .search(collection_name, query_vector, limit, filter)
            .await?;

        Ok(points.into_iter().map(SearchResult::from).collect())
    }

    #[tracing::instrument(name = "Getting collection info", skip(self))]
    pub async fn collection_info(&self, collection_name: &str) -> Option<CollectionInfo> {
        match self.vector_store.collection_info(collection_name).await {
            Ok(collection_info) => {
                info!(
                    points_count = collection_info.points_count,
                    vector_size = collection_info.vector_size,
                    distance = %collection_info.distance,
                    "Collection '{}' info",
                    collection_name
                );
                Some(collection_info)
            }
            Err(error) => {
                error!(?error, "Failed to get info of collection '{}'", collection_name);
                None
            }
        }
    }
}

#[derive(thiserror::Error)]
pub enum PreparePointError {
    #[error(transparent)]
    EmbeddingsServiceError(#[from] EmbeddingsServiceError),
    #[error(transparent)]
    ContentPointError(#[from] ContentPointError),
    #[error("Embeddings of size {actual} do not fit the collection vector size {expected}")]
    DimensionMismatch { expected: u64, actual: usize },
}

impl std::fmt::Debug for PreparePointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    EmbeddingsServiceError(#[from] EmbeddingsServiceError),
    #[error(transparent)]
    VectorStoreError(#[from] VectorStoreError),
}

impl std::fmt::Debug for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
