use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use qdrant_client::{
    prelude::QdrantClient,
    qdrant::{
        self, point_id::PointIdOptions, value::Kind, vectors_config::Config, Condition,
        CreateCollection, Filter, ListValue, PointStruct, ScoredPoint, SearchPoints, Struct,
        VectorParams, VectorsConfig,
    },
};
use serde_json::{Map, Number, Value as JsonValue};
use tracing::info;

use crate::{
    domain::entities::{
        collection::{CollectionInfo, Distance},
        content_point::{ContentPoint, Embeddings},
        payload_filter::PayloadFilter,
        search_result::ScoredContentPoint,
    },
    ports::vector_store::{VectorStore, VectorStoreError},
};

/// Repository for content points persisted in Qdrant collections
pub struct ContentPointQdrantRepository {
    client: QdrantClient,
}

impl ContentPointQdrantRepository {
    pub fn new(client: QdrantClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VectorStore for ContentPointQdrantRepository {
    #[tracing::instrument(name = "Listing Qdrant collections", skip(self))]
    async fn list_collections(&self) -> Result<HashSet<String>, VectorStoreError> {
        let response = self.client.list_collections().await.map_err(qdrant_error)?;

        Ok(response
            .collections
            .into_iter()
            .map(|collection| collection.name)
            .collect())
    }

    #[tracing::instrument(name = "Creating Qdrant collection", skip(self))]
    async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
        distance: Distance,
    ) -> Result<(), VectorStoreError> {
        match self
            .client
            .create_collection(&CreateCollection {
                collection_name: collection_name.to_string(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: vector_size,
                        distance: qdrant::Distance::from(distance) as i32,
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
        {
            Ok(_) => Ok(()),
            // Qdrant client only returns anyhow errors for now.
            // Created in between our listing and this call: same end state.
            Err(error) if error.to_string().contains("already exists") => {
                info!(?error, "Collection was created concurrently");
                Ok(())
            }
            Err(error) => Err(qdrant_error(error)),
        }
    }

    #[tracing::instrument(
        name = "Saving content points to Qdrant",
        skip(self, points),
        fields(nb_points = points.len())
    )]
    async fn upsert(
        &self,
        collection_name: &str,
        points: Vec<ContentPoint>,
    ) -> Result<(), VectorStoreError> {
        let points: Vec<PointStruct> = points.into_iter().map(PointStruct::from).collect();

        self.client
            .upsert_points_blocking(collection_name, points, None)
            .await
            .map_err(qdrant_error)?;

        info!("Saved content points");
        Ok(())
    }

    #[tracing::instrument(name = "Searching content points in Qdrant", skip(self, vector))]
    async fn search(
        &self,
        collection_name: &str,
        vector: Embeddings,
        limit: u64,
        filter: Option<PayloadFilter>,
    ) -> Result<Vec<ScoredContentPoint>, VectorStoreError> {
        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: collection_name.to_string(),
                vector,
                filter: filter.map(Filter::from),
                limit,
                with_payload: Some(true.into()),
                ..Default::default()
            })
            .await
            .map_err(qdrant_error)?;

        response
            .result
            .into_iter()
            .map(ScoredContentPoint::try_from)
            .collect()
    }

    #[tracing::instrument(name = "Getting Qdrant collection info", skip(self))]
    async fn collection_info(
        &self,
        collection_name: &str,
    ) -> Result<CollectionInfo, VectorStoreError> {
        let info = self
            .client
            .collection_info(collection_name)
            .await
            .map_err(qdrant_error)?
            .result
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection_name.to_string()))?;

        let vectors_config = info
            .config
            .and_then(|config| config.params)
            .and_then(|params| params.vectors_config)
            .and_then(|vectors_config| vectors_config.config);

        let (vector_size, distance) = match vectors_config {
            Some(Config::Params(VectorParams { size, distance, .. })) => {
                (size, distance_from_qdrant(distance)?)
            }
            _ => {
                return Err(VectorStoreError::ConfigurationError(format!(
                    "collection {} does not have a single unnamed vector",
                    collection_name
                )))
            }
        };

        Ok(CollectionInfo {
            points_count: info.points_count,
            vector_size,
            distance,
        })
    }
}

fn qdrant_error(error: anyhow::Error) -> VectorStoreError {
    VectorStoreError::StoreError(error.to_string())
}

impl From<Distance> for qdrant::Distance {
    fn from(distance: Distance) -> Self {
        match distance {
            Distance::Cosine => qdrant::Distance::Cosine,
            Distance::Dot => qdrant::Distance::Dot,
            Distance::Euclid => qdrant::Distance::Euclid,
        }
    }
}

fn distance_from_qdrant(distance: i32) -> Result<Distance, VectorStoreError> {
    [Distance::Cosine, Distance::Dot, Distance::Euclid]
        .into_iter()
        .find(|candidate| qdrant::Distance::from(*candidate) as i32 == distance)
        .ok_or_else(|| {
            VectorStoreError::ConfigurationError(format!("unsupported distance {}", distance))
        })
}

impl From<ContentPoint> for PointStruct {
    fn from(content_point: ContentPoint) -> Self {
        Self {
            id: Some(content_point.id.into()),
            vectors: Some(content_point.vector.into()),
            payload: content_point
                .payload
                .into_fields()
                .into_iter()
                .map(|(key, value)| (key, json_to_qdrant(value)))
                .collect(),
        }
    }
}

impl From<PayloadFilter> for Filter {
    fn from(filter: PayloadFilter) -> Self {
        Filter::all(
            filter
                .must_match
                .into_iter()
                .map(|condition| Condition::matches(condition.key, condition.value)),
        )
    }
}

impl TryFrom<ScoredPoint> for ScoredContentPoint {
    type Error = VectorStoreError;

    fn try_from(point: ScoredPoint) -> Result<Self, Self::Error> {
        let id = match point.id.and_then(|id| id.point_id_options) {
            Some(PointIdOptions::Num(id)) => id,
            other => {
                return Err(VectorStoreError::InvalidPoint(format!(
                    "expected a numeric point id, got {:?}",
                    other
                )))
            }
        };

        Ok(Self {
            id,
            score: point.score,
            payload: qdrant_payload_to_json(point.payload).into(),
        })
    }
}

fn qdrant_payload_to_json(payload: HashMap<String, qdrant::Value>) -> Map<String, JsonValue> {
    payload
        .into_iter()
        .map(|(key, value)| (key, qdrant_to_json(value)))
        .collect()
}

fn json_to_qdrant(value: JsonValue) -> qdrant::Value {
    let kind = match value {
        JsonValue::Null => Kind::NullValue(0),
        JsonValue::Bool(value) => Kind::BoolValue(value),
        // Qdrant integers are i64: larger unsigned numbers are stored as lossy doubles
        JsonValue::Number(number) => match number.as_i64() {
            Some(integer) => Kind::IntegerValue(integer),
            None => Kind::DoubleValue(number.as_f64().unwrap_or_default()),
        },
        JsonValue::String(value) => Kind::StringValue(value),
        JsonValue::Array(values) => Kind::ListValue(ListValue {
            values: values.into_iter().map(json_to_qdrant).collect(),
        }),
        JsonValue::Object(fields) => Kind::StructValue(Struct {
            fields: fields
                .into_iter()
                .map(|(key, value)| (key, json_to_qdrant(value)))
                .collect(),
        }),
    };

    qdrant::Value { kind: Some(kind) }
}

fn qdrant_to_json(value: qdrant::Value) -> JsonValue {
    match value.kind {
        None | Some(Kind::NullValue(_)) => JsonValue::Null,
        Some(Kind::BoolValue(value)) => JsonValue::Bool(value),
        Some(Kind::IntegerValue(value)) => JsonValue::from(value),
        Some(Kind::DoubleValue(value)) => Number::from_f64(value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Some(Kind::StringValue(value)) => JsonValue::String(value),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.into_iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(object)) => JsonValue::Object(
            object
                .fields
                .into_iter()
                .map(|(key, value)| (key, qdrant_to_json(value)))
                .collect(),
        ),
    }
}
