use std::path::PathBuf;

use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::services::{deployer::DEFAULT_BATCH_SIZE, evaluation::DEFAULT_EVALUATION_LIMIT};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub qdrant: QdrantSettings,
    pub embedding: EmbeddingSettings,
    pub deployment: DeploymentSettings,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QdrantSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub grpc_port: u16,
    pub api_key: Option<Secret<String>>,
    /// Collection the records are deployed to
    pub collection: String,
}

impl QdrantSettings {
    pub fn get_grpc_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.grpc_port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingSettings {
    /// Sentence embeddings model name, ex: `all-minilm-l12-v2`
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeploymentSettings {
    pub chunks_path: PathBuf,
    pub metadata_path: PathBuf,
    #[serde(
        default = "default_batch_size",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvaluationSettings {
    /// No evaluation is run without a queries file
    pub queries_path: Option<PathBuf>,
    #[serde(
        default = "default_evaluation_limit",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub limit: u64,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            queries_path: None,
            limit: DEFAULT_EVALUATION_LIMIT,
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_evaluation_limit() -> u64 {
    DEFAULT_EVALUATION_LIMIT
}

/// Extracts app settings from configuration files and env variables
///
/// `base.yaml` should contain shared settings for all environments.
/// A specific env file should be created for each environment: `develop.yaml`,`local.yaml` and `production.yaml`
/// The environment is set with the env var `APP_ENVIRONMENT`.
/// If `APP_ENVIRONMENT` is not set, `develop.yaml` is the default.
///
/// Settings are also taken from environment variables: with a prefix of APP and '__' as separator
/// For ex: `APP_QDRANT__COLLECTION=rag_documents` would set `Settings.qdrant.collection`
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    // Detects the running environment.
    // Default to `develop` if unspecified.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "develop".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

/// The possible runtime environment for our application.
#[derive(Debug, PartialEq)]
pub enum Environment {
    Develop,
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Develop => "develop",
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "develop" => Ok(Self::Develop),
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `develop`, `local` or `production`.",
                other
            )),
        }
    }
}
