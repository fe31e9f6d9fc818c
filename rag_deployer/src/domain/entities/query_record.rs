use serde::{Deserialize, Serialize};

/// A labeled query of the evaluation file: the folder and topic results are expected to carry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryRecord {
    pub query: String,
    #[serde(alias = "expected_folder")]
    pub folder: String,
    #[serde(alias = "expected_topic")]
    pub topic: String,
}
