use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ToolResult;
use crate::models::{SyncStats, Tool};
use crate::sync_state::{CollectionName, SyncMetadataPatch, SyncStatus};

/// Query for approved tools by tracking state
#[derive(Debug, Clone, PartialEq)]
pub struct SyncQuery {
    /// Match tools whose `overall_status` is one of these
    pub statuses: Vec<SyncStatus>,
    /// Also match approved tools without a tracking block
    pub include_unsynced: bool,
    pub limit: i64,
    pub offset: u64,
}

impl SyncQuery {
    /// Tools the sweep should look at: pending, failed and never-synced
    pub fn drifted(limit: i64) -> Self {
        Self {
            statuses: vec![SyncStatus::Pending, SyncStatus::Failed, SyncStatus::Stale],
            include_unsynced: true,
            limit,
            offset: 0,
        }
    }

    pub fn with_statuses(statuses: Vec<SyncStatus>, limit: i64) -> Self {
        Self {
            statuses,
            include_unsynced: false,
            limit,
            offset: 0,
        }
    }

    pub fn page(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Shared matching rule for store implementations
    pub fn matches(&self, tool: &Tool) -> bool {
        if !tool.is_eligible() {
            return false;
        }
        match tool.sync_metadata {
            Some(ref metadata) => self.statuses.contains(&metadata.overall_status),
            None => self.include_unsynced,
        }
    }
}

/// Primary-store contract consumed by the sync subsystem.
///
/// Results are ordered by `sync_metadata.updated_at` ascending, tools without
/// a tracking block first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> ToolResult<Option<Tool>>;

    async fn get_by_slug(&self, slug: &str) -> ToolResult<Option<Tool>>;

    /// Approved tools matching `query`
    async fn find_by_sync_status(&self, query: SyncQuery) -> ToolResult<Vec<Tool>>;

    /// Apply field-level set/increment operations to a tool's tracking block,
    /// creating the block if missing, then recompute `overall_status`.
    ///
    /// Returns `ToolError::NotFound` when the tool does not exist.
    async fn apply_sync_patch(&self, id: Uuid, patch: SyncMetadataPatch) -> ToolResult<()>;

    async fn sync_stats(&self) -> ToolResult<SyncStats>;

    /// Reset `collection` to `pending` with no hash on every approved tool
    /// that has a tracking block. Returns the number of tools touched.
    async fn reset_collection_state(&self, collection: CollectionName) -> ToolResult<u64>;
}
