//! Sync subsystem metrics
//!
//! Recorded through the `metrics` facade; the binary installs the
//! Prometheus exporter. Without a recorder every call is a no-op.

use std::time::Duration;

use domain_tools::CollectionName;
use metrics::{counter, histogram};

use crate::models::SyncOutcome;

/// Sweep record outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepRecordStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl SweepRecordStatus {
    fn as_str(&self) -> &'static str {
        match self {
            SweepRecordStatus::Succeeded => "succeeded",
            SweepRecordStatus::Failed => "failed",
            SweepRecordStatus::Skipped => "skipped",
        }
    }
}

pub fn record_collection_outcome(collection: CollectionName, outcome: SyncOutcome) {
    counter!(
        "tool_sync_collection_total",
        "collection" => collection.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_embedding_call() {
    counter!("tool_sync_embedding_calls_total").increment(1);
}

pub fn record_sweep_records(status: SweepRecordStatus, count: usize) {
    if count == 0 {
        return;
    }
    counter!("tool_sync_sweep_records_total", "status" => status.as_str()).increment(count as u64);
}

pub fn record_sweep_duration(duration: Duration) {
    histogram!("tool_sync_sweep_duration_seconds").record(duration.as_secs_f64());
}
