use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    self, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId, PointStruct,
    PointsIdsList, SetPayloadPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::instrument;
use uuid::Uuid;

use super::QdrantConfig;
use crate::error::{ErrorKind, VectorError, VectorResult};
use crate::models::{DistanceMetric, Vector, VectorConfig};
use crate::repository::VectorRepository;

/// Qdrant-backed implementation of VectorRepository
pub struct QdrantRepository {
    client: Qdrant,
    collection_prefix: String,
}

impl QdrantRepository {
    pub async fn new(config: QdrantConfig) -> VectorResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder.build().map_err(|e| {
            VectorError::qdrant(ErrorKind::Connection, format!("Failed to build client: {}", e))
        })?;

        tracing::info!(url = %config.url, prefix = %config.collection_prefix, "Qdrant client ready");

        Ok(Self {
            client,
            collection_prefix: config.collection_prefix,
        })
    }

    pub fn from_client(client: Qdrant, collection_prefix: impl Into<String>) -> Self {
        Self {
            client,
            collection_prefix: collection_prefix.into(),
        }
    }

    /// Physical collection name for a logical one
    pub fn collection_name(&self, collection: &str) -> String {
        format!("{}{}", self.collection_prefix, collection)
    }

    fn to_qdrant_distance(metric: DistanceMetric) -> Distance {
        match metric {
            DistanceMetric::Cosine => Distance::Cosine,
            DistanceMetric::Euclidean => Distance::Euclid,
            DistanceMetric::DotProduct => Distance::Dot,
            DistanceMetric::Manhattan => Distance::Manhattan,
        }
    }

    fn uuid_to_point_id(id: Uuid) -> PointId {
        PointId::from(id.to_string())
    }

    fn payload_to_qdrant(payload: Option<serde_json::Value>) -> HashMap<String, QdrantValue> {
        let Some(serde_json::Value::Object(map)) = payload else {
            return HashMap::new();
        };

        map.into_iter()
            .map(|(key, val)| (key, json_to_qdrant_value(val)))
            .collect()
    }
}

fn json_to_qdrant_value(val: serde_json::Value) -> QdrantValue {
    use qdrant::value::Kind;

    let kind = match val {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Kind::StringValue(s),
        serde_json::Value::Array(items) => Kind::ListValue(qdrant::ListValue {
            values: items.into_iter().map(json_to_qdrant_value).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(qdrant::Struct {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, json_to_qdrant_value(v)))
                .collect(),
        }),
    };

    QdrantValue { kind: Some(kind) }
}

#[async_trait]
impl VectorRepository for QdrantRepository {
    #[instrument(skip(self, config), fields(dimension = config.dimension))]
    async fn ensure_collection(
        &self,
        collection: &str,
        config: VectorConfig,
    ) -> VectorResult<bool> {
        let full_name = self.collection_name(collection);

        if self.client.collection_exists(&full_name).await? {
            return Ok(false);
        }

        let mut builder =
            CreateCollectionBuilder::new(&full_name).vectors_config(VectorParamsBuilder::new(
                config.dimension as u64,
                Self::to_qdrant_distance(config.distance),
            ));

        if let Some(hnsw) = &config.hnsw {
            let mut hnsw_config = qdrant::HnswConfigDiff::default();
            if let Some(m) = hnsw.m {
                hnsw_config.m = Some(m as u64);
            }
            if let Some(ef) = hnsw.ef_construct {
                hnsw_config.ef_construct = Some(ef as u64);
            }
            if let Some(threshold) = hnsw.full_scan_threshold {
                hnsw_config.full_scan_threshold = Some(threshold as u64);
            }
            builder = builder.hnsw_config(hnsw_config);
        }

        self.client.create_collection(builder).await?;

        tracing::info!(collection = %full_name, "Created vector collection");
        Ok(true)
    }

    #[instrument(skip(self, vector), fields(id = %vector.id))]
    async fn upsert(&self, collection: &str, vector: Vector) -> VectorResult<Uuid> {
        let full_name = self.collection_name(collection);

        let point = PointStruct::new(
            Self::uuid_to_point_id(vector.id),
            vector.values,
            Self::payload_to_qdrant(vector.payload),
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&full_name, vec![point]).wait(true))
            .await?;

        Ok(vector.id)
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: Uuid) -> VectorResult<()> {
        let full_name = self.collection_name(collection);

        let builder = DeletePointsBuilder::new(&full_name)
            .points(PointsIdsList {
                ids: vec![Self::uuid_to_point_id(id)],
            })
            .wait(true);

        self.client.delete_points(builder).await?;
        Ok(())
    }

    #[instrument(skip(self, payload))]
    async fn update_payload(
        &self,
        collection: &str,
        id: Uuid,
        payload: serde_json::Value,
    ) -> VectorResult<()> {
        if !payload.is_object() {
            return Err(VectorError::Validation(
                "Payload must be a JSON object".to_string(),
            ));
        }

        let full_name = self.collection_name(collection);
        let payload = Payload::from(Self::payload_to_qdrant(Some(payload)));

        let builder = SetPayloadPointsBuilder::new(&full_name, payload)
            .points_selector(PointsIdsList {
                ids: vec![Self::uuid_to_point_id(id)],
            })
            .wait(true);

        self.client.overwrite_payload(builder).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_collection(&self, collection: &str) -> VectorResult<()> {
        let full_name = self.collection_name(collection);

        // An empty filter matches every point
        let builder = DeletePointsBuilder::new(&full_name)
            .points(Filter::default())
            .wait(true);

        self.client.delete_points(builder).await?;

        tracing::warn!(collection = %full_name, "Cleared vector collection");
        Ok(())
    }
}
