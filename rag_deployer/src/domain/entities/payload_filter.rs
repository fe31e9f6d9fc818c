use serde_json::{Map, Value as JsonValue};

pub const FOLDER_KEY: &str = "folder";
pub const TOPIC_KEY: &str = "topic";

/// A conjunction of equality conditions on payload keys
///
/// A point passes the filter only when every condition holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PayloadFilter {
    pub must_match: Vec<FieldMatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub key: String,
    pub value: String,
}

impl PayloadFilter {
    /// Builds the filter for the optional folder and topic labels.
    ///
    /// Returns `None` when no label is given (or only empty ones), meaning an unfiltered search.
    pub fn from_labels(folder: Option<&str>, topic: Option<&str>) -> Option<Self> {
        let must_match: Vec<FieldMatch> = [(FOLDER_KEY, folder), (TOPIC_KEY, topic)]
            .into_iter()
            .filter_map(|(key, value)| match value {
                Some(value) if !value.is_empty() => Some(FieldMatch {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
                _ => None,
            })
            .collect();

        if must_match.is_empty() {
            None
        } else {
            Some(Self { must_match })
        }
    }

    pub fn matches(&self, payload: &Map<String, JsonValue>) -> bool {
        self.must_match.iter().all(|condition| {
            payload.get(&condition.key).and_then(JsonValue::as_str) == Some(condition.value.as_str())
        })
    }
}
