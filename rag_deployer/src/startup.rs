use std::sync::Arc;

use qdrant_client::prelude::{QdrantClient, QdrantClientConfig};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::{
    configuration::{QdrantSettings, Settings},
    domain::services::{
        data_loader::{self, DataLoaderError},
        deployer::{RagDeployer, UploadReport},
        evaluation::{self, EvaluationReport},
    },
    ports::{embeddings_service::EmbeddingsService, vector_store::VectorStore},
    repositories::content_point_qdrant_repository::ContentPointQdrantRepository,
    services::huggingface_embedding::{
        parse_model_type, HuggingFaceEmbeddingsService, HuggingFaceEmbeddingsServiceError,
    },
};

/// Holds the deployer built from the settings, ready to run the deployment pipeline
pub struct Application {
    settings: Settings,
    deployer: RagDeployer,
}

/// What a deployment run did
#[derive(Debug)]
pub struct DeploymentReport {
    pub upload: UploadReport,
    /// `None` when no queries file is configured
    pub evaluation: Option<EvaluationReport>,
}

impl Application {
    #[tracing::instrument(name = "Building deployer application", skip(settings))]
    pub async fn build(settings: Settings) -> Result<Self, ApplicationError> {
        let qdrant_client = get_qdrant_client(&settings.qdrant)?;
        let vector_store = Arc::new(ContentPointQdrantRepository::new(qdrant_client));

        let model_type = parse_model_type(&settings.embedding.model)?;
        let embeddings_service = Arc::new(HuggingFaceEmbeddingsService::try_new(model_type).await?);

        Ok(Self::with_services(settings, embeddings_service, vector_store))
    }

    /// Builds the application on already created services
    pub fn with_services(
        settings: Settings,
        embeddings_service: Arc<dyn EmbeddingsService>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            settings,
            deployer: RagDeployer::new(embeddings_service, vector_store),
        }
    }

    pub fn deployer(&self) -> &RagDeployer {
        &self.deployer
    }

    /// Loads the records, deploys them into the configured collection then evaluates the retrieval.
    ///
    /// Fails on unreadable or malformed input files, and when the collection can not be provisioned.
    /// Any other failure is logged and reported.
    #[tracing::instrument(name = "Running deployment", skip(self), fields(collection = %self.settings.qdrant.collection))]
    pub async fn run(&self) -> Result<DeploymentReport, ApplicationError> {
        let collection_name = &self.settings.qdrant.collection;
        let deployment = &self.settings.deployment;

        let records = data_loader::load(&deployment.chunks_path, &deployment.metadata_path)?;
        info!("Loaded {} records", records.len());

        if !self.deployer.ensure_collection(collection_name).await {
            return Err(ApplicationError::CollectionUnavailable(
                collection_name.to_string(),
            ));
        }

        let upload = self
            .deployer
            .upload(collection_name, &records, deployment.batch_size)
            .await;

        self.deployer.collection_info(collection_name).await;

        let evaluation = match &self.settings.evaluation.queries_path {
            Some(queries_path) => {
                let queries = data_loader::load_queries(queries_path)?;
                Some(
                    evaluation::evaluate(
                        &self.deployer,
                        collection_name,
                        &queries,
                        self.settings.evaluation.limit,
                    )
                    .await,
                )
            }
            None => {
                warn!("No queries file configured, skipping evaluation");
                None
            }
        };

        info!("Deployment done 👋");
        Ok(DeploymentReport { upload, evaluation })
    }
}

/// Set up a client to Qdrant
pub fn get_qdrant_client(config: &QdrantSettings) -> Result<QdrantClient, ApplicationError> {
    let mut qdrant_config = QdrantClientConfig::from_url(&config.get_grpc_base_url());
    if let Some(api_key) = &config.api_key {
        qdrant_config.set_api_key(api_key.expose_secret());
    }

    QdrantClient::new(Some(qdrant_config)).map_err(|e| ApplicationError::QdrantError(e.to_string()))
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationError {
    #[error(transparent)]
    DataLoaderError(#[from] DataLoaderError),
    #[error(transparent)]
    HuggingFaceEmbeddingsServiceError(#[from] HuggingFaceEmbeddingsServiceError),
    #[error("Error from Qdrant: {0}")]
    QdrantError(String),
    #[error("Collection {0} could not be created or checked")]
    CollectionUnavailable(String),
}
