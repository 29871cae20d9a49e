//! MongoDB implementation of ToolRepository

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Bson, Document, doc, to_bson},
    options::FindOptions,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ToolError, ToolResult};
use crate::models::{SyncStats, Tool, ToolStatus};
use crate::repository::{SyncQuery, ToolRepository};
use crate::sync_state::{
    CollectionName, CollectionSyncState, RetryCountOp, SyncMetadata, SyncMetadataPatch,
    SyncStatus,
};

/// MongoDB implementation of the ToolRepository
pub struct MongoToolRepository {
    collection: Collection<Tool>,
}

impl MongoToolRepository {
    /// Create a repository over the `tools` collection
    ///
    /// # Example
    /// ```ignore
    /// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
    /// let repo = MongoToolRepository::new(client.database("catalog"));
    /// ```
    pub fn new(db: Database) -> Self {
        Self::with_collection(db, "tools")
    }

    /// Create a repository with a custom collection name
    pub fn with_collection(db: Database, collection_name: &str) -> Self {
        let collection = db.collection::<Tool>(collection_name);
        Self { collection }
    }

    /// Get the underlying collection for advanced operations
    pub fn collection(&self) -> &Collection<Tool> {
        &self.collection
    }

    fn id_filter(id: Uuid) -> Document {
        doc! { "_id": to_bson(&id).unwrap_or(Bson::Null) }
    }

    fn approved() -> Bson {
        Bson::String(ToolStatus::Approved.to_string())
    }

    /// Build a MongoDB filter document from SyncQuery
    fn build_filter(query: &SyncQuery) -> Document {
        let statuses: Vec<Bson> = query
            .statuses
            .iter()
            .map(|s| Bson::String(s.to_string()))
            .collect();

        let mut branches = vec![doc! {
            "sync_metadata.overall_status": { "$in": statuses }
        }];
        if query.include_unsynced {
            branches.push(doc! { "sync_metadata": null });
        }

        doc! {
            "status": Self::approved(),
            "$or": branches,
        }
    }

    /// Filter matching tools with at least one stale collection
    fn stale_filter() -> Document {
        let branches: Vec<Document> = CollectionName::ALL
            .iter()
            .map(|c| {
                doc! {
                    format!("sync_metadata.collections.{}.status", c): SyncStatus::Stale.to_string()
                }
            })
            .collect();
        doc! { "status": Self::approved(), "$or": branches }
    }

    /// Translate a patch into one update pipeline: create the tracking
    /// block if missing, apply the field changes, recompute `overall_status`.
    ///
    /// Runs as a single atomic update, so readers never see an
    /// `overall_status` that disagrees with the collection states.
    fn build_update(patch: &SyncMetadataPatch) -> ToolResult<Vec<Document>> {
        let now = Utc::now();
        let mut set = Document::new();

        for (collection, change) in &patch.collections {
            let prefix = format!("sync_metadata.collections.{}", collection);

            if let Some(status) = change.status {
                set.insert(format!("{prefix}.status"), literal(&status.to_string())?);
            }
            if let Some(ref hash) = change.content_hash {
                set.insert(format!("{prefix}.content_hash"), literal(hash)?);
            }
            if let Some(ref error) = change.last_error {
                set.insert(format!("{prefix}.last_error"), literal(error)?);
            }
            if let Some(ref code) = change.error_code {
                set.insert(format!("{prefix}.error_code"), literal(code)?);
            }
            if let Some(ref at) = change.last_synced_at {
                set.insert(format!("{prefix}.last_synced_at"), literal(at)?);
            }
            if let Some(ref at) = change.last_sync_attempt_at {
                set.insert(format!("{prefix}.last_sync_attempt_at"), literal(at)?);
            }
            match change.retry_count {
                RetryCountOp::Keep => {}
                RetryCountOp::Reset => {
                    set.insert(format!("{prefix}.retry_count"), literal(&0_i64)?);
                }
                RetryCountOp::Increment => {
                    set.insert(
                        format!("{prefix}.retry_count"),
                        doc! {
                            "$add": [
                                { "$ifNull": [format!("${prefix}.retry_count"), 0_i64] },
                                1_i64,
                            ]
                        },
                    );
                }
            }
        }

        set.insert("sync_metadata.updated_at", literal(&now)?);

        let mut pipeline = vec![
            doc! {
                "$set": {
                    "sync_metadata": {
                        "$ifNull": ["$sync_metadata", literal(&SyncMetadata::empty(now))?]
                    }
                }
            },
            doc! { "$set": set },
        ];
        pipeline.extend(Self::overall_status_pipeline());
        Ok(pipeline)
    }

    /// Pipeline recomputing `overall_status` from the stored collection states
    fn overall_status_pipeline() -> Vec<Document> {
        let states: Vec<Bson> = CollectionName::ALL
            .iter()
            .map(|c| {
                Bson::Document(doc! {
                    "$ifNull": [format!("$sync_metadata.collections.{}.status", c), "pending"]
                })
            })
            .collect();

        vec![doc! {
            "$set": {
                "sync_metadata.overall_status": {
                    "$switch": {
                        "branches": [
                            {
                                "case": { "$in": ["failed", states.clone()] },
                                "then": "failed",
                            },
                            {
                                "case": {
                                    "$allElementsTrue": [{
                                        "$map": {
                                            "input": states,
                                            "as": "s",
                                            "in": { "$eq": ["$$s", "synced"] },
                                        }
                                    }]
                                },
                                "then": "synced",
                            },
                        ],
                        "default": "pending",
                    }
                }
            }
        }]
    }

    async fn count(&self, filter: Document) -> ToolResult<u64> {
        Ok(self.collection.count_documents(filter).await?)
    }
}

fn bson<T: Serialize + ?Sized>(value: &T) -> ToolResult<Bson> {
    Ok(to_bson(value)?)
}

/// A value taken as-is inside a pipeline, even a string starting with `$`
fn literal<T: Serialize + ?Sized>(value: &T) -> ToolResult<Document> {
    Ok(doc! { "$literal": bson(value)? })
}

#[async_trait]
impl ToolRepository for MongoToolRepository {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> ToolResult<Option<Tool>> {
        let tool = self.collection.find_one(Self::id_filter(id)).await?;
        Ok(tool)
    }

    #[instrument(skip(self))]
    async fn get_by_slug(&self, slug: &str) -> ToolResult<Option<Tool>> {
        let tool = self.collection.find_one(doc! { "slug": slug }).await?;
        Ok(tool)
    }

    #[instrument(skip(self))]
    async fn find_by_sync_status(&self, query: SyncQuery) -> ToolResult<Vec<Tool>> {
        let options = FindOptions::builder()
            .limit(query.limit)
            .skip(query.offset)
            .sort(doc! { "sync_metadata.updated_at": 1, "_id": 1 })
            .build();

        let cursor = self
            .collection
            .find(Self::build_filter(&query))
            .with_options(options)
            .await?;
        let tools: Vec<Tool> = cursor.try_collect().await?;

        Ok(tools)
    }

    #[instrument(skip(self, patch), fields(collections = patch.collections.len()))]
    async fn apply_sync_patch(&self, id: Uuid, patch: SyncMetadataPatch) -> ToolResult<()> {
        let result = self
            .collection
            .update_one(Self::id_filter(id), Self::build_update(&patch)?)
            .await?;
        if result.matched_count == 0 {
            return Err(ToolError::NotFound(id));
        }

        tracing::debug!(tool_id = %id, "Sync metadata updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn sync_stats(&self) -> ToolResult<SyncStats> {
        let by_status = |status: SyncStatus| {
            doc! {
                "status": Self::approved(),
                "sync_metadata.overall_status": status.to_string(),
            }
        };

        Ok(SyncStats {
            total: self.count(doc! { "status": Self::approved() }).await?,
            synced: self.count(by_status(SyncStatus::Synced)).await?,
            pending: self.count(by_status(SyncStatus::Pending)).await?,
            failed: self.count(by_status(SyncStatus::Failed)).await?,
            stale: self.count(Self::stale_filter()).await?,
            unsynced: self
                .count(doc! { "status": Self::approved(), "sync_metadata": null })
                .await?,
        })
    }

    #[instrument(skip(self))]
    async fn reset_collection_state(&self, collection: CollectionName) -> ToolResult<u64> {
        let filter = doc! {
            "status": Self::approved(),
            "sync_metadata": { "$ne": null },
        };

        let mut pipeline = vec![doc! {
            "$set": {
                format!("sync_metadata.collections.{}", collection):
                    literal(&CollectionSyncState::default())?,
                "sync_metadata.updated_at": literal(&Utc::now())?,
            }
        }];
        pipeline.extend(Self::overall_status_pipeline());

        let result = self.collection.update_many(filter, pipeline).await?;

        tracing::info!(
            collection = %collection,
            modified = result.modified_count,
            "Collection sync state reset"
        );
        Ok(result.modified_count)
    }
}
