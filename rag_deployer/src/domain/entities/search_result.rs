use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::{
    content_point::{ContentPointPayload, CONTENT_KEY},
    payload_filter::{FOLDER_KEY, TOPIC_KEY},
    record::{RecordId, DATA_ID_KEY, ID_KEY},
};

/// A point returned by a similarity search, with its score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredContentPoint {
    pub id: RecordId,
    pub score: f32,
    pub payload: ContentPointPayload,
}

/// A search hit with the content separated from the rest of the payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub score: f32,
    pub content: String,
    pub metadata: Map<String, JsonValue>,
}

impl SearchResult {
    pub fn folder(&self) -> Option<&str> {
        self.metadata.get(FOLDER_KEY).and_then(JsonValue::as_str)
    }

    pub fn topic(&self) -> Option<&str> {
        self.metadata.get(TOPIC_KEY).and_then(JsonValue::as_str)
    }

    /// Read from `id`, or `data_id` for records keyed the legacy way
    pub fn id(&self) -> Option<RecordId> {
        self.metadata
            .get(ID_KEY)
            .or_else(|| self.metadata.get(DATA_ID_KEY))
            .and_then(JsonValue::as_u64)
    }
}

impl From<ScoredContentPoint> for SearchResult {
    fn from(point: ScoredContentPoint) -> Self {
        let mut metadata = point.payload.into_fields();
        let content = match metadata.remove(CONTENT_KEY) {
            Some(JsonValue::String(content)) => content,
            _ => String::new(),
        };

        Self {
            score: point.score,
            content,
            metadata,
        }
    }
}
