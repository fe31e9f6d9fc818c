use common::helper::error_chain_fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub type RecordId = u64;

/// Key of the record id in the input files
pub const ID_KEY: &str = "id";
/// Legacy key of the record id, accepted in place of `id`
pub const DATA_ID_KEY: &str = "data_id";

/// A unit of source text, as found in the chunks file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Chunk {
    #[serde(alias = "data_id")]
    pub id: RecordId,
    pub content: String,
}

/// Descriptive attributes attached to a chunk, as found in the metadata file
///
/// All the keys of the source object are kept as written, the id key included,
/// and end up in the stored payload. Their values are only checked when the record is uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMetadata {
    pub id: RecordId,
    pub fields: Map<String, JsonValue>,
}

impl RecordMetadata {
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(JsonValue::as_str)
    }
}

impl TryFrom<JsonValue> for RecordMetadata {
    type Error = RecordMetadataError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        let JsonValue::Object(fields) = value else {
            return Err(RecordMetadataError::NotAnObject(value.to_string()));
        };

        let id = match fields.get(ID_KEY).or_else(|| fields.get(DATA_ID_KEY)) {
            Some(id) => id
                .as_u64()
                .ok_or_else(|| RecordMetadataError::InvalidId(id.to_string()))?,
            None => return Err(RecordMetadataError::MissingId),
        };

        Ok(Self { id, fields })
    }
}

#[derive(thiserror::Error)]
pub enum RecordMetadataError {
    #[error("Metadata entry is not a JSON object: {0}")]
    NotAnObject(String),

    #[error("Metadata entry has no `id` nor `data_id`")]
    MissingId,

    #[error("Metadata id {0} is not an unsigned integer")]
    InvalidId(String),
}

impl std::fmt::Debug for RecordMetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// A chunk joined with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub content: String,
    pub metadata: RecordMetadata,
}

impl Record {
    pub fn id(&self) -> RecordId {
        self.metadata.id
    }
}
