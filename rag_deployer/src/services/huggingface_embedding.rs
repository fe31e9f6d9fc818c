use async_trait::async_trait;
use common::helper::error_chain_fmt;
use rust_bert::{
    pipelines::sentence_embeddings::{
        SentenceEmbeddingsBuilder, SentenceEmbeddingsModel, SentenceEmbeddingsModelType,
    },
    RustBertError,
};
use std::{
    sync::mpsc,
    thread::{self, JoinHandle},
};
use tokio::{sync::oneshot, task};
use tracing::{error, info};

use crate::{
    domain::entities::content_point::Embeddings,
    ports::embeddings_service::{EmbeddingsService, EmbeddingsServiceError},
};

/// Service to generate embeddings from a text, using sentence embeddings models available from Hugging Face.
///
/// The whole text is encoded as a single vector.
pub struct HuggingFaceEmbeddingsService {
    sender_to_runner: mpsc::SyncSender<RunnerMessage>,
    dimensionality: u64,
    _thread_handle: JoinHandle<()>,
}

impl HuggingFaceEmbeddingsService {
    /// Spawns the embeddings runner on a separate thread and waits for its model to be loaded
    ///
    /// The model is downloaded on first use, which can take a while.
    #[tracing::instrument(name = "Loading embeddings model", skip_all)]
    pub async fn try_new(
        model_type: SentenceEmbeddingsModelType,
    ) -> Result<Self, HuggingFaceEmbeddingsServiceError> {
        let (sender, receiver) = mpsc::sync_channel(100);
        let (ready_sender, ready_receiver) = oneshot::channel();
        let handle = thread::spawn(move || Self::runner(model_type, receiver, ready_sender));

        let dimensionality = ready_receiver.await??;
        info!(dimensionality, "Embeddings model loaded ✅");

        Ok(Self {
            sender_to_runner: sender,
            dimensionality,
            _thread_handle: handle,
        })
    }

    /// The embeddings generator runner itself
    ///
    /// Embeddings generation is a long blocking computation which must not run inside a future,
    /// so the model lives on its own thread.
    ///
    /// The dimensionality (or the loading error) is sent once on `ready`, then each received message
    /// carries a text to encode and a sender for the resulting embeddings.
    fn runner(
        model_type: SentenceEmbeddingsModelType,
        receiver: mpsc::Receiver<RunnerMessage>,
        ready: oneshot::Sender<Result<u64, RustBertError>>,
    ) {
        let model = match Self::load_model(model_type) {
            Ok((model, dimensionality)) => {
                if ready.send(Ok(dimensionality)).is_err() {
                    return;
                }
                model
            }
            Err(error) => {
                let _ = ready.send(Err(error));
                return;
            }
        };

        while let Ok((text, sender)) = receiver.recv() {
            let embeddings = model.encode(&[text.as_str()]).and_then(|mut embeddings| {
                embeddings
                    .pop()
                    .ok_or_else(|| RustBertError::ValueError("empty embeddings output".into()))
            });

            if sender.send(embeddings).is_err() {
                error!("Embeddings requester dropped before receiving its result");
            }
        }
    }

    /// Probes the model once for the size of its output vectors
    fn load_model(
        model_type: SentenceEmbeddingsModelType,
    ) -> Result<(SentenceEmbeddingsModel, u64), RustBertError> {
        let model = SentenceEmbeddingsBuilder::remote(model_type).create_model()?;
        let dimensionality = output_dimensionality(&model.encode(&["dimensionality probe"])?)?;

        Ok((model, dimensionality))
    }

    #[tracing::instrument(name = "Generate embeddings", skip(self, text))]
    pub async fn generate_embeddings(
        &self,
        text: &str,
    ) -> Result<Embeddings, HuggingFaceEmbeddingsServiceError> {
        let (sender, receiver) = oneshot::channel();

        task::block_in_place(|| self.sender_to_runner.send((text.to_string(), sender)))?;

        Ok(receiver.await??)
    }
}

#[async_trait]
impl EmbeddingsService for HuggingFaceEmbeddingsService {
    fn dimensionality(&self) -> u64 {
        self.dimensionality
    }

    async fn embed(&self, text: &str) -> Result<Embeddings, EmbeddingsServiceError> {
        let embeddings = self
            .generate_embeddings(text)
            .await
            .map_err(anyhow::Error::from)?;

        if embeddings.is_empty() {
            return Err(EmbeddingsServiceError::NoEmbeddings);
        }
        Ok(embeddings)
    }
}

/// Size of the first output vector, an empty output or vector is an error
fn output_dimensionality(output: &[Embeddings]) -> Result<u64, RustBertError> {
    match output.first() {
        Some(embeddings) if !embeddings.is_empty() => Ok(embeddings.len() as u64),
        _ => Err(RustBertError::ValueError(
            "model produced no embeddings for the dimensionality probe".into(),
        )),
    }
}

/// Gets the sentence embeddings model from its configuration name, ex: `all-minilm-l12-v2`
pub fn parse_model_type(
    name: &str,
) -> Result<SentenceEmbeddingsModelType, HuggingFaceEmbeddingsServiceError> {
    match name.to_lowercase().as_str() {
        "all-minilm-l12-v2" => Ok(SentenceEmbeddingsModelType::AllMiniLmL12V2),
        "all-minilm-l6-v2" => Ok(SentenceEmbeddingsModelType::AllMiniLmL6V2),
        "all-distilroberta-v1" => Ok(SentenceEmbeddingsModelType::AllDistilrobertaV1),
        "bert-base-nli-mean-tokens" => Ok(SentenceEmbeddingsModelType::BertBaseNliMeanTokens),
        "distiluse-base-multilingual-cased" => {
            Ok(SentenceEmbeddingsModelType::DistiluseBaseMultilingualCased)
        }
        "paraphrase-albert-small-v2" => Ok(SentenceEmbeddingsModelType::ParaphraseAlbertSmallV2),
        "sentence-t5-base" => Ok(SentenceEmbeddingsModelType::SentenceT5Base),
        other => Err(HuggingFaceEmbeddingsServiceError::UnknownModel(
            other.to_string(),
        )),
    }
}

#[derive(thiserror::Error)]
pub enum HuggingFaceEmbeddingsServiceError {
    #[error("Embeddings model error: {0}")]
    ModelError(#[from] RustBertError),
    #[error("Unknown sentence embeddings model: {0}")]
    UnknownModel(String),
    #[error(transparent)]
    SenderError(#[from] mpsc::SendError<RunnerMessage>),
    #[error(transparent)]
    ReceiverError(#[from] oneshot::error::RecvError),
}

impl std::fmt::Debug for HuggingFaceEmbeddingsServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Message type for internal channel, passing around the input text and its generated embeddings
pub type RunnerMessage = (String, oneshot::Sender<Result<Embeddings, RustBertError>>);
