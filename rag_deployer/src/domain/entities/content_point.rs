use common::helper::error_chain_fmt;
use serde_json::{Map, Value as JsonValue};

use super::{
    payload_filter::{FOLDER_KEY, TOPIC_KEY},
    record::{Record, RecordId},
};

pub type Embeddings = Vec<f32>;

/// Payload key holding the chunk text, next to the metadata keys
pub const CONTENT_KEY: &str = "content";

/// A point as stored in the vector store: one per uploaded `Record`, sharing its id
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPoint {
    pub id: RecordId,
    pub vector: Embeddings,
    pub payload: ContentPointPayload,
}

/// Metadata fields merged with the content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentPointPayload(Map<String, JsonValue>);

impl ContentPointPayload {
    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, JsonValue> {
        self.0
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(JsonValue::as_str)
    }
}

impl TryFrom<&Record> for ContentPointPayload {
    type Error = ContentPointError;

    /// Fails when a label is there but is not a string.
    /// A `content` key of the metadata is replaced by the chunk text.
    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        for key in [FOLDER_KEY, TOPIC_KEY] {
            match record.metadata.get(key) {
                None | Some(JsonValue::String(_)) => {}
                Some(other) => {
                    return Err(ContentPointError::InvalidLabel {
                        key,
                        value: other.to_string(),
                    })
                }
            }
        }

        let mut fields = record.metadata.fields.clone();
        fields.insert(CONTENT_KEY.into(), JsonValue::from(record.content.as_str()));

        Ok(Self(fields))
    }
}

impl From<Map<String, JsonValue>> for ContentPointPayload {
    fn from(fields: Map<String, JsonValue>) -> Self {
        Self(fields)
    }
}

#[derive(thiserror::Error)]
pub enum ContentPointError {
    #[error("Metadata `{key}` should be a string, found {value}")]
    InvalidLabel { key: &'static str, value: String },
}

impl std::fmt::Debug for ContentPointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
