use async_trait::async_trait;
use uuid::Uuid;

use crate::error::VectorResult;
use crate::models::{Vector, VectorConfig};

/// Repository trait for vector storage operations
///
/// Collection names are the logical names; implementations may add a
/// deployment prefix.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Create the collection if it does not exist; returns true when created
    async fn ensure_collection(&self, collection: &str, config: VectorConfig)
    -> VectorResult<bool>;

    /// Insert or replace a point (vector and payload)
    async fn upsert(&self, collection: &str, vector: Vector) -> VectorResult<Uuid>;

    async fn delete(&self, collection: &str, id: Uuid) -> VectorResult<()>;

    /// Replace the stored payload of an existing point, keeping its vector
    async fn update_payload(
        &self,
        collection: &str,
        id: Uuid,
        payload: serde_json::Value,
    ) -> VectorResult<()>;

    /// Remove every point in the collection (administrative re-seed)
    async fn clear_collection(&self, collection: &str) -> VectorResult<()>;
}
