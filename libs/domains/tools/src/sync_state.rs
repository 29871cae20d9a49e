//! Per-collection sync tracking stored on every tool.
//!
//! The tracking block is only ever changed through [`SyncMetadataPatch`],
//! which translates into field-level set and increment operations so
//! concurrent writers never overwrite each other's updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// A partition of the vector index.
///
/// Declaration order is the processing order, and `Ord` follows it so maps
/// keyed by collection iterate in that order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CollectionName {
    Tools,
    Functionality,
    Usecases,
    Interface,
}

impl CollectionName {
    pub const ALL: [CollectionName; 4] = [
        CollectionName::Tools,
        CollectionName::Functionality,
        CollectionName::Usecases,
        CollectionName::Interface,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Tools => "tools",
            CollectionName::Functionality => "functionality",
            CollectionName::Usecases => "usecases",
            CollectionName::Interface => "interface",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    #[default]
    Pending,
    Failed,
    /// Administrative override: resync regardless of hash equality
    Stale,
}

/// Machine-readable failure code stored next to `last_error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncErrorCode {
    ContentGenerationFailed,
    EmbeddingFailed,
    VectorUpsertFailed,
    VectorDeleteFailed,
    RecordNotFound,
    InvalidRecordData,
    MetadataPersistFailed,
    ValidationFailed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSyncState {
    pub status: SyncStatus,
    /// Fingerprint of the content last embedded and stored successfully
    pub content_hash: Option<String>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub error_code: Option<SyncErrorCode>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_sync_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMetadata {
    pub overall_status: SyncStatus,
    #[serde(default)]
    pub collections: BTreeMap<CollectionName, CollectionSyncState>,
    pub updated_at: DateTime<Utc>,
}

impl SyncMetadata {
    /// Every collection `pending` with no hash
    pub fn pending(now: DateTime<Utc>) -> Self {
        let collections = CollectionName::ALL
            .iter()
            .map(|c| (*c, CollectionSyncState::default()))
            .collect();
        Self {
            overall_status: SyncStatus::Pending,
            collections,
            updated_at: now,
        }
    }

    /// Tracking block with no collection entries yet
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            overall_status: SyncStatus::Pending,
            collections: BTreeMap::new(),
            updated_at: now,
        }
    }

    pub fn collection(&self, collection: CollectionName) -> Option<&CollectionSyncState> {
        self.collections.get(&collection)
    }

    /// A collection without an entry counts as `pending`
    pub fn status_of(&self, collection: CollectionName) -> SyncStatus {
        self.collections
            .get(&collection)
            .map(|s| s.status)
            .unwrap_or_default()
    }

    pub fn content_hash(&self, collection: CollectionName) -> Option<&str> {
        self.collections
            .get(&collection)
            .and_then(|s| s.content_hash.as_deref())
    }

    /// `failed` if any collection failed, `synced` if all are synced, else `pending`
    pub fn compute_overall(&self) -> SyncStatus {
        overall_status(CollectionName::ALL.iter().map(|c| self.status_of(*c)))
    }

    /// Collections whose status is one of `statuses`, in declared order
    pub fn collections_with_status(&self, statuses: &[SyncStatus]) -> Vec<CollectionName> {
        CollectionName::ALL
            .iter()
            .copied()
            .filter(|c| statuses.contains(&self.status_of(*c)))
            .collect()
    }

    pub fn has_status(&self, status: SyncStatus) -> bool {
        CollectionName::ALL
            .iter()
            .any(|c| self.status_of(*c) == status)
    }

    /// Apply a patch in memory with the same semantics the store uses
    pub fn apply(&mut self, patch: &SyncMetadataPatch, now: DateTime<Utc>) {
        for (collection, change) in &patch.collections {
            let state = self.collections.entry(*collection).or_default();
            change.apply_to(state);
        }
        self.updated_at = now;
        self.overall_status = self.compute_overall();
    }
}

pub fn overall_status(statuses: impl IntoIterator<Item = SyncStatus>) -> SyncStatus {
    let mut all_synced = true;
    for status in statuses {
        match status {
            SyncStatus::Failed => return SyncStatus::Failed,
            SyncStatus::Synced => {}
            _ => all_synced = false,
        }
    }
    if all_synced {
        SyncStatus::Synced
    } else {
        SyncStatus::Pending
    }
}

/// What happens to `retry_count` when a patch is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryCountOp {
    #[default]
    Keep,
    Reset,
    Increment,
}

/// Field-level change to one collection's state.
///
/// `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionPatch {
    pub status: Option<SyncStatus>,
    pub content_hash: Option<Option<String>>,
    pub last_error: Option<Option<String>>,
    pub error_code: Option<Option<SyncErrorCode>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_sync_attempt_at: Option<DateTime<Utc>>,
    pub retry_count: RetryCountOp,
}

impl CollectionPatch {
    /// Embed-and-store succeeded
    pub fn succeeded(content_hash: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(SyncStatus::Synced),
            content_hash: Some(Some(content_hash.into())),
            last_error: Some(None),
            error_code: Some(None),
            last_synced_at: Some(now),
            last_sync_attempt_at: Some(now),
            retry_count: RetryCountOp::Reset,
        }
    }

    /// All attempts of one cycle exhausted
    pub fn failed(error: impl Into<String>, code: SyncErrorCode, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(SyncStatus::Failed),
            last_error: Some(Some(error.into())),
            error_code: Some(Some(code)),
            last_sync_attempt_at: Some(now),
            retry_count: RetryCountOp::Increment,
            ..Self::default()
        }
    }

    /// Payload-only refresh succeeded; status and hash stay as they are
    pub fn payload_refreshed(now: DateTime<Utc>) -> Self {
        Self {
            last_sync_attempt_at: Some(now),
            ..Self::default()
        }
    }

    /// Payload-only refresh failed; the next sweep re-syncs the collection
    pub fn payload_failed(error: impl Into<String>, code: SyncErrorCode, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(SyncStatus::Pending),
            last_error: Some(Some(error.into())),
            error_code: Some(Some(code)),
            last_sync_attempt_at: Some(now),
            ..Self::default()
        }
    }

    pub fn stale() -> Self {
        Self {
            status: Some(SyncStatus::Stale),
            ..Self::default()
        }
    }

    pub fn reset_retry() -> Self {
        Self {
            retry_count: RetryCountOp::Reset,
            ..Self::default()
        }
    }

    /// Back to the freshly-eligible state: `pending`, no hash, no error
    pub fn reset_pending() -> Self {
        Self {
            status: Some(SyncStatus::Pending),
            content_hash: Some(None),
            last_error: Some(None),
            error_code: Some(None),
            retry_count: RetryCountOp::Reset,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, state: &mut CollectionSyncState) {
        if let Some(status) = self.status {
            state.status = status;
        }
        if let Some(ref hash) = self.content_hash {
            state.content_hash = hash.clone();
        }
        if let Some(ref error) = self.last_error {
            state.last_error = error.clone();
        }
        if let Some(code) = self.error_code {
            state.error_code = code;
        }
        if let Some(at) = self.last_synced_at {
            state.last_synced_at = Some(at);
        }
        if let Some(at) = self.last_sync_attempt_at {
            state.last_sync_attempt_at = Some(at);
        }
        match self.retry_count {
            RetryCountOp::Keep => {}
            RetryCountOp::Reset => state.retry_count = 0,
            RetryCountOp::Increment => state.retry_count = state.retry_count.saturating_add(1),
        }
    }
}

/// Changes to several collections applied as one partial update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncMetadataPatch {
    pub collections: BTreeMap<CollectionName, CollectionPatch>,
}

impl SyncMetadataPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collection: CollectionName, patch: CollectionPatch) -> Self {
        self.set(collection, patch);
        self
    }

    pub fn set(&mut self, collection: CollectionName, patch: CollectionPatch) {
        self.collections.insert(collection, patch);
    }

    /// Same patch for every collection in `collections`
    pub fn for_each(
        collections: impl IntoIterator<Item = CollectionName>,
        patch: CollectionPatch,
    ) -> Self {
        let collections = collections
            .into_iter()
            .map(|c| (c, patch.clone()))
            .collect();
        Self { collections }
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(CollectionPatch::is_empty)
    }
}
