//! In-memory ToolRepository for tests and local runs

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{ToolError, ToolResult};
use crate::models::{SyncStats, Tool};
use crate::repository::{SyncQuery, ToolRepository};
use crate::sync_state::{
    CollectionName, CollectionPatch, SyncMetadata, SyncMetadataPatch, SyncStatus,
};

/// Stores tools in a map; every patch is applied under one lock so
/// concurrent writers behave like the field-level store updates.
#[derive(Default)]
pub struct InMemoryToolRepository {
    tools: Mutex<HashMap<Uuid, Tool>>,
    failing_patches: AtomicU32,
    failing_queries: AtomicU32,
    patch_calls: AtomicUsize,
}

impl InMemoryToolRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(tools: impl IntoIterator<Item = Tool>) -> Self {
        let repo = Self::new();
        for tool in tools {
            repo.insert(tool);
        }
        repo
    }

    pub fn insert(&self, tool: Tool) {
        self.lock().insert(tool.id, tool);
    }

    pub fn get(&self, id: Uuid) -> Option<Tool> {
        self.lock().get(&id).cloned()
    }

    pub fn remove(&self, id: Uuid) -> Option<Tool> {
        self.lock().remove(&id)
    }

    /// Make the next `count` calls to `apply_sync_patch` fail
    pub fn fail_next_patches(&self, count: u32) {
        self.failing_patches.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `find_by_sync_status` fail
    pub fn fail_next_queries(&self, count: u32) {
        self.failing_queries.store(count, Ordering::SeqCst);
    }

    /// Number of `apply_sync_patch` calls seen so far
    pub fn patch_calls(&self) -> usize {
        self.patch_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Tool>> {
        self.tools.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sorted(&self, query: &SyncQuery) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .lock()
            .values()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        tools.sort_by_key(|t| (t.sync_metadata.as_ref().map(|m| m.updated_at), t.id));
        tools
    }
}

#[async_trait]
impl ToolRepository for InMemoryToolRepository {
    async fn get_by_id(&self, id: Uuid) -> ToolResult<Option<Tool>> {
        Ok(self.get(id))
    }

    async fn get_by_slug(&self, slug: &str) -> ToolResult<Option<Tool>> {
        Ok(self.lock().values().find(|t| t.slug == slug).cloned())
    }

    async fn find_by_sync_status(&self, query: SyncQuery) -> ToolResult<Vec<Tool>> {
        if Self::take_failure(&self.failing_queries) {
            return Err(ToolError::Database("injected query failure".to_string()));
        }
        let limit = usize::try_from(query.limit.max(0)).unwrap_or(usize::MAX);
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        Ok(self
            .sorted(&query)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn apply_sync_patch(&self, id: Uuid, patch: SyncMetadataPatch) -> ToolResult<()> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);

        if Self::take_failure(&self.failing_patches) {
            return Err(ToolError::Database("injected write failure".to_string()));
        }

        let mut tools = self.lock();
        let tool = tools.get_mut(&id).ok_or(ToolError::NotFound(id))?;
        let now = Utc::now();
        tool.sync_metadata
            .get_or_insert_with(|| SyncMetadata::empty(now))
            .apply(&patch, now);
        Ok(())
    }

    async fn sync_stats(&self) -> ToolResult<SyncStats> {
        let tools = self.lock();
        let mut stats = SyncStats::default();

        for tool in tools.values().filter(|t| t.is_eligible()) {
            stats.total += 1;
            let Some(ref metadata) = tool.sync_metadata else {
                stats.unsynced += 1;
                continue;
            };
            match metadata.overall_status {
                SyncStatus::Synced => stats.synced += 1,
                SyncStatus::Failed => stats.failed += 1,
                SyncStatus::Pending | SyncStatus::Stale => stats.pending += 1,
            }
            if metadata.has_status(SyncStatus::Stale) {
                stats.stale += 1;
            }
        }

        Ok(stats)
    }

    async fn reset_collection_state(&self, collection: CollectionName) -> ToolResult<u64> {
        let mut tools = self.lock();
        let now = Utc::now();
        let patch = SyncMetadataPatch::new().with(collection, CollectionPatch::reset_pending());
        let mut touched = 0;

        for tool in tools.values_mut().filter(|t| t.is_eligible()) {
            if let Some(ref mut metadata) = tool.sync_metadata {
                metadata.apply(&patch, now);
                touched += 1;
            }
        }

        Ok(touched)
    }
}
