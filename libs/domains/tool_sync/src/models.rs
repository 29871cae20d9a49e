use std::time::Duration;

use chrono::{DateTime, Utc};
use domain_tools::{CollectionName, SyncErrorCode};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::error::SyncError;
use crate::scheduler::SweepConfig;

/// Options for a full or restricted sync of one tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Sync even when the stored hash matches
    pub force: bool,
    /// Restrict to these collections (processed in declared order)
    pub collections: Option<Vec<CollectionName>>,
    /// In-call attempts per collection, service default when unset
    pub max_retries: Option<u32>,
}

impl SyncOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    pub fn only(mut self, collections: impl IntoIterator<Item = CollectionName>) -> Self {
        self.collections = Some(collections.into_iter().collect());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Target collections in declared order, without duplicates
    pub fn targets(&self) -> Vec<CollectionName> {
        match self.collections {
            Some(ref wanted) => CollectionName::ALL
                .iter()
                .copied()
                .filter(|c| wanted.contains(c))
                .collect(),
            None => CollectionName::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncOutcome {
    Synced,
    Skipped,
    Failed,
    PayloadUpdated,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Synced => "synced",
            SyncOutcome::Skipped => "skipped",
            SyncOutcome::Failed => "failed",
            SyncOutcome::PayloadUpdated => "payload_updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSyncResult {
    pub collection: CollectionName,
    pub outcome: SyncOutcome,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<SyncErrorCode>,
}

impl CollectionSyncResult {
    pub fn synced(collection: CollectionName, content_hash: String, attempts: u32) -> Self {
        Self {
            collection,
            outcome: SyncOutcome::Synced,
            attempts,
            content_hash: Some(content_hash),
            error: None,
            error_code: None,
        }
    }

    pub fn skipped(collection: CollectionName) -> Self {
        Self {
            collection,
            outcome: SyncOutcome::Skipped,
            attempts: 0,
            content_hash: None,
            error: None,
            error_code: None,
        }
    }

    pub fn failed(collection: CollectionName, error: &SyncError, attempts: u32) -> Self {
        Self {
            collection,
            outcome: SyncOutcome::Failed,
            attempts,
            content_hash: None,
            error: Some(error.to_string()),
            error_code: Some(error.code()),
        }
    }

    pub fn payload_updated(collection: CollectionName, attempts: u32) -> Self {
        Self {
            collection,
            outcome: SyncOutcome::PayloadUpdated,
            attempts,
            content_hash: None,
            error: None,
            error_code: None,
        }
    }
}

/// Outcome of one orchestrator call for one tool.
///
/// `synced_count` includes payload-only refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub tool_id: Uuid,
    pub success: bool,
    pub collections: Vec<CollectionSyncResult>,
    pub synced_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub duration_ms: u64,
    pub metadata_persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<SyncErrorCode>,
}

impl SyncResult {
    pub fn from_collections(
        tool_id: Uuid,
        collections: Vec<CollectionSyncResult>,
        duration: Duration,
        metadata_persisted: bool,
    ) -> Self {
        let count = |outcomes: &[SyncOutcome]| {
            collections
                .iter()
                .filter(|c| outcomes.contains(&c.outcome))
                .count()
        };
        let synced_count = count(&[SyncOutcome::Synced, SyncOutcome::PayloadUpdated]);
        let failed_count = count(&[SyncOutcome::Failed]);
        let skipped_count = count(&[SyncOutcome::Skipped]);

        Self {
            tool_id,
            success: failed_count == 0,
            collections,
            synced_count,
            failed_count,
            skipped_count,
            duration_ms: duration.as_millis() as u64,
            metadata_persisted,
            error: None,
            error_code: None,
        }
    }

    /// Every collection skipped, nothing written
    pub fn noop(tool_id: Uuid, collections: &[CollectionName]) -> Self {
        let collections = collections
            .iter()
            .map(|c| CollectionSyncResult::skipped(*c))
            .collect();
        Self::from_collections(tool_id, collections, Duration::ZERO, true)
    }

    /// The call failed before any collection was attempted
    pub fn error(tool_id: Uuid, error: &SyncError, duration: Duration) -> Self {
        Self {
            tool_id,
            success: false,
            collections: Vec::new(),
            synced_count: 0,
            failed_count: 0,
            skipped_count: 0,
            duration_ms: duration.as_millis() as u64,
            metadata_persisted: false,
            error: Some(error.to_string()),
            error_code: Some(error.code()),
        }
    }

    pub fn collection(&self, collection: CollectionName) -> Option<&CollectionSyncResult> {
        self.collections.iter().find(|c| c.collection == collection)
    }

    /// Top-level error or the failed collections' errors, joined
    pub fn error_summary(&self) -> Option<String> {
        if let Some(ref error) = self.error {
            return Some(error.clone());
        }
        let failures: Vec<String> = self
            .collections
            .iter()
            .filter_map(|c| c.error.as_ref().map(|e| format!("{}: {}", c.collection, e)))
            .collect();
        (!failures.is_empty()).then(|| failures.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDeleteResult {
    pub collection: CollectionName,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Best-effort removal from every collection; failures are surfaced, not compensated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub tool_id: Uuid,
    pub success: bool,
    pub collections: Vec<CollectionDeleteResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepError {
    pub tool_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub started_at: DateTime<Utc>,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Candidates left alone because their backoff has not elapsed
    pub skipped: usize,
    pub duration_ms: u64,
    pub errors: Vec<SweepError>,
    /// Set when the sweep could not run at all, e.g. the candidate query failed
    pub error: Option<String>,
    pub error_code: Option<SyncErrorCode>,
    /// This caller joined a sweep that was already running
    pub joined: bool,
}

impl SweepResult {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            duration_ms: 0,
            errors: Vec::new(),
            error: None,
            error_code: None,
            joined: false,
        }
    }

    /// A sweep that stopped before processing anything
    pub fn aborted(started_at: DateTime<Utc>, error: &SyncError) -> Self {
        Self {
            error: Some(error.to_string()),
            error_code: Some(error.code()),
            ..Self::new(started_at)
        }
    }
}

/// Scheduler state for observability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub is_running: bool,
    pub last_sweep_at: Option<DateTime<Utc>>,
    pub last_sweep_duration_ms: Option<u64>,
    pub processed_count: u64,
    pub success_count: u64,
    pub failed_count: u64,
    pub next_sweep_at: Option<DateTime<Utc>>,
    pub config: SweepConfig,
}

/// Result of a single administrative action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub tool_id: Uuid,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<SyncErrorCode>,
}

impl ActionResult {
    pub fn ok(tool_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            tool_id,
            success: true,
            message: message.into(),
            error_code: None,
        }
    }

    pub fn failed(tool_id: Uuid, error: &SyncError) -> Self {
        Self {
            tool_id,
            success: false,
            message: error.to_string(),
            error_code: Some(error.code()),
        }
    }

    pub fn from_sync(result: &SyncResult) -> Self {
        if result.success {
            return Self::ok(
                result.tool_id,
                format!(
                    "{} synced, {} skipped",
                    result.synced_count, result.skipped_count
                ),
            );
        }

        let error_code = result.error_code.or_else(|| {
            result
                .collections
                .iter()
                .find_map(|c| c.error_code)
        });
        Self {
            tool_id: result.tool_id,
            success: false,
            message: result
                .error_summary()
                .unwrap_or_else(|| "sync failed".to_string()),
            error_code,
        }
    }
}

/// Results of an administrative action over several tools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchActionResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ActionResult>,
}

impl FromIterator<ActionResult> for BatchActionResult {
    fn from_iter<I: IntoIterator<Item = ActionResult>>(iter: I) -> Self {
        let results: Vec<ActionResult> = iter.into_iter().collect();
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}
