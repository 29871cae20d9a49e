//! Sweep scheduler
//!
//! A timer-driven worker that finds drifted tools, applies cross-sweep
//! backoff to those that keep failing and drives the rest through the
//! [`SyncService`]. Only one sweep runs at a time; overlapping triggers join
//! the sweep already in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use core_config::{ConfigError, FromEnv, env_bool, env_parse};
use database::RetryPolicy;
use domain_tools::{
    CollectionName, CollectionPatch, SyncMetadataPatch, SyncQuery, SyncStatus, Tool,
};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::metrics::{self, SweepRecordStatus};
use crate::models::{
    ActionResult, BatchActionResult, SweepError, SweepResult, SyncResult, WorkerStatus,
};
use crate::service::SyncService;

/// Largest id list accepted by the batch admin operations
pub const MAX_BATCH_IDS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Records processed per sweep
    pub batch_size: usize,
    /// Records synced concurrently within a sweep (1 = sequential)
    pub concurrency: usize,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
    /// Candidate pages scanned per sweep, so records in backoff do not
    /// starve due records behind them
    pub max_scan_pages: usize,
    pub shutdown_grace_secs: u64,
    /// Errors kept in a sweep result
    pub max_errors: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            batch_size: 50,
            concurrency: 1,
            backoff_base_secs: 60,
            backoff_max_secs: 3600,
            max_scan_pages: 5,
            shutdown_grace_secs: 30,
            max_errors: 20,
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Cross-sweep backoff: `min(base * 2^retry_count, max)`
    pub fn backoff_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            Duration::from_secs(self.backoff_base_secs),
            Duration::from_secs(self.backoff_max_secs),
        )
    }
}

impl FromEnv for SweepConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            enabled: env_bool("SWEEP_ENABLED", defaults.enabled)?,
            interval_secs: env_parse("SWEEP_INTERVAL_SECS", defaults.interval_secs)?,
            batch_size: env_parse("SWEEP_BATCH_SIZE", defaults.batch_size)?,
            concurrency: env_parse("SWEEP_CONCURRENCY", defaults.concurrency)?,
            backoff_base_secs: env_parse("SWEEP_BACKOFF_BASE_SECS", defaults.backoff_base_secs)?,
            backoff_max_secs: env_parse("SWEEP_BACKOFF_MAX_SECS", defaults.backoff_max_secs)?,
            max_scan_pages: env_parse("SWEEP_MAX_SCAN_PAGES", defaults.max_scan_pages)?,
            shutdown_grace_secs: env_parse(
                "SWEEP_SHUTDOWN_GRACE_SECS",
                defaults.shutdown_grace_secs,
            )?,
            max_errors: env_parse("SWEEP_MAX_ERRORS", defaults.max_errors)?,
        };

        if config.interval_secs == 0 || config.batch_size == 0 || config.concurrency == 0 {
            return Err(ConfigError::ParseError {
                key: "SWEEP_*".to_string(),
                details: "interval, batch size and concurrency must be positive".to_string(),
            });
        }
        Ok(config)
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    is_running: bool,
    last_sweep_at: Option<DateTime<Utc>>,
    last_sweep_duration_ms: Option<u64>,
    processed_count: u64,
    success_count: u64,
    failed_count: u64,
    next_sweep_at: Option<DateTime<Utc>>,
}

type SharedSweep = Shared<BoxFuture<'static, SweepResult>>;

pub struct SweepScheduler {
    service: Arc<SyncService>,
    config: SweepConfig,
    backoff: RetryPolicy,
    state: RwLock<SchedulerState>,
    in_flight: Mutex<Option<SharedSweep>>,
}

impl SweepScheduler {
    pub fn new(service: Arc<SyncService>, config: SweepConfig) -> Self {
        Self {
            service,
            backoff: config.backoff_policy(),
            config,
            state: RwLock::new(SchedulerState::default()),
            in_flight: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run the timer loop until `shutdown` flips to true (or its sender is
    /// dropped), then wait up to the grace period for the in-flight sweep.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if !self.config.enabled {
            info!("Sweep scheduler disabled");
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
            return;
        }

        info!(
            interval_secs = self.config.interval_secs,
            batch_size = self.config.batch_size,
            concurrency = self.config.concurrency,
            "Starting sweep scheduler"
        );

        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Received shutdown signal, stopping sweep scheduler");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.state.write().await.next_sweep_at = next_tick(self.config.interval());

                    if self.in_flight.lock().await.is_some() {
                        debug!("Previous sweep still running, skipping tick");
                        continue;
                    }

                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        this.trigger_sweep().await;
                    });
                }
            }
        }

        self.drain().await;
        info!("Sweep scheduler stopped");
    }

    async fn drain(&self) {
        let running = self.in_flight.lock().await.clone();
        let Some(sweep) = running else {
            return;
        };

        info!(
            grace_secs = self.config.shutdown_grace_secs,
            "Waiting for in-flight sweep"
        );
        if tokio::time::timeout(self.config.shutdown_grace(), sweep)
            .await
            .is_err()
        {
            warn!("In-flight sweep did not finish within the grace period");
        }
    }

    /// Run one sweep now, or join the one already running
    pub async fn trigger_sweep(self: &Arc<Self>) -> SweepResult {
        let (sweep, joined) = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(running) => (running.clone(), true),
                None => {
                    let sweep = self.spawn_sweep();
                    *slot = Some(sweep.clone());
                    (sweep, false)
                }
            }
        };

        if joined {
            debug!("Joining in-flight sweep");
        }
        let mut result = sweep.await;
        result.joined = joined;
        result
    }

    fn spawn_sweep(self: &Arc<Self>) -> SharedSweep {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let result = this.sweep().await;
            this.in_flight.lock().await.take();
            result
        });

        let this = Arc::clone(self);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Sweep task panicked");
                    this.in_flight.lock().await.take();
                    this.state.write().await.is_running = false;
                    let mut result = SweepResult::new(Utc::now());
                    result.error = Some(format!("sweep task panicked: {e}"));
                    result
                }
            }
        }
        .boxed()
        .shared()
    }

    #[instrument(skip(self))]
    async fn sweep(&self) -> SweepResult {
        let started_at = Utc::now();
        let timer = Instant::now();
        self.state.write().await.is_running = true;

        let mut result = SweepResult::new(started_at);
        match self.collect_due(started_at).await {
            Ok((due, skipped)) => {
                result.skipped = skipped;
                for synced in self.process(due).await {
                    self.tally(&mut result, &synced);
                }
            }
            Err(e) => {
                error!(error = %e, error_code = %e.code(), "Failed to list drifted tools");
                result = SweepResult::aborted(started_at, &e);
            }
        }

        let elapsed = timer.elapsed();
        result.duration_ms = elapsed.as_millis() as u64;

        metrics::record_sweep_records(SweepRecordStatus::Succeeded, result.succeeded);
        metrics::record_sweep_records(SweepRecordStatus::Failed, result.failed);
        metrics::record_sweep_records(SweepRecordStatus::Skipped, result.skipped);
        metrics::record_sweep_duration(elapsed);

        {
            let mut state = self.state.write().await;
            state.is_running = false;
            state.last_sweep_at = Some(started_at);
            state.last_sweep_duration_ms = Some(result.duration_ms);
            state.processed_count += result.processed as u64;
            state.success_count += result.succeeded as u64;
            state.failed_count += result.failed as u64;
        }

        if result.processed > 0 || result.skipped > 0 {
            info!(
                processed = result.processed,
                succeeded = result.succeeded,
                failed = result.failed,
                skipped = result.skipped,
                duration_ms = result.duration_ms,
                "Sweep finished"
            );
        } else {
            debug!("Sweep found nothing to do");
        }
        result
    }

    fn tally(&self, result: &mut SweepResult, synced: &SyncResult) {
        result.processed += 1;
        if synced.success {
            result.succeeded += 1;
            return;
        }

        result.failed += 1;
        if result.errors.len() < self.config.max_errors {
            result.errors.push(SweepError {
                tool_id: synced.tool_id,
                message: synced
                    .error_summary()
                    .unwrap_or_else(|| "sync failed".to_string()),
            });
        }
    }

    /// Up to `batch_size` drifted tools whose backoff has elapsed, plus the
    /// number of candidates left alone because it has not.
    async fn collect_due(&self, now: DateTime<Utc>) -> Result<(Vec<Tool>, usize), SyncError> {
        let batch = self.config.batch_size;
        let mut due = Vec::with_capacity(batch);
        let mut skipped = 0;

        'scan: for page in 0..self.config.max_scan_pages {
            let query = SyncQuery::drifted(batch as i64).page((page * batch) as u64);
            let candidates = self.service.tools().find_by_sync_status(query).await?;
            let last_page = candidates.len() < batch;

            for tool in candidates {
                if due.len() >= batch {
                    break 'scan;
                }
                if self.is_due(&tool, now) {
                    due.push(tool);
                } else {
                    skipped += 1;
                }
            }

            if last_page {
                break;
            }
        }

        Ok((due, skipped))
    }

    /// Backoff uses the highest retry count and latest attempt among the
    /// tool's failed collections.
    fn is_due(&self, tool: &Tool, now: DateTime<Utc>) -> bool {
        let Some(ref metadata) = tool.sync_metadata else {
            return true;
        };

        let failed = metadata
            .collections
            .values()
            .filter(|s| s.status == SyncStatus::Failed);
        let (retry_count, last_attempt) = failed.fold((0, None), |(count, last), state| {
            (
                count.max(state.retry_count),
                last.max(state.last_sync_attempt_at),
            )
        });

        if retry_count == 0 && last_attempt.is_none() {
            return true;
        }
        let due = self.backoff.is_due(last_attempt, retry_count, now);
        if !due {
            debug!(tool_id = %tool.id, retry_count, "Tool in backoff, skipping");
        }
        due
    }

    async fn process(&self, tools: Vec<Tool>) -> Vec<SyncResult> {
        if self.config.concurrency <= 1 {
            let mut results = Vec::with_capacity(tools.len());
            for tool in tools {
                results.push(self.service.sync_unsynced(&tool).await);
            }
            return results;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut join_set: JoinSet<SyncResult> = JoinSet::new();

        for tool in tools {
            let semaphore = Arc::clone(&semaphore);
            let service = Arc::clone(&self.service);
            join_set.spawn(async move {
                let _permit = semaphore.acquire().await.ok();
                service.sync_unsynced(&tool).await
            });
        }

        let mut results = Vec::with_capacity(join_set.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!(error = %e, "Tool sync task panicked"),
            }
        }
        results
    }

    // ------------------------------------------------------------------
    // Administrative operations
    // ------------------------------------------------------------------

    /// Sync one tool now, ignoring its backoff
    pub async fn force_retry(&self, tool_id: Uuid) -> SyncResult {
        info!(tool_id = %tool_id, "Forced retry");
        self.service.retry_failed(tool_id).await
    }

    /// Retry every tool whose overall status is `failed`, ignoring backoff
    #[instrument(skip(self))]
    pub async fn force_retry_all_failed(&self) -> Result<BatchActionResult, SyncError> {
        let ids = self.failed_tool_ids().await?;
        info!(count = ids.len(), "Forcing retry of all failed tools");
        Ok(self.retry_ids(&ids).await)
    }

    async fn failed_tool_ids(&self) -> Result<Vec<Uuid>, SyncError> {
        let page_size = self.config.batch_size.max(1);
        let mut ids = Vec::new();

        loop {
            let query = SyncQuery::with_statuses(vec![SyncStatus::Failed], page_size as i64)
                .page(ids.len() as u64);
            let page = self.service.tools().find_by_sync_status(query).await?;
            let last_page = page.len() < page_size;
            ids.extend(page.into_iter().map(|t| t.id));
            if last_page {
                return Ok(ids);
            }
        }
    }

    async fn retry_ids(&self, ids: &[Uuid]) -> BatchActionResult {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            results.push(ActionResult::from_sync(&self.force_retry(id).await));
        }
        results.into_iter().collect()
    }

    /// Zero the backoff counter of every tracked collection without syncing
    #[instrument(skip(self))]
    pub async fn reset_retry_count(&self, tool_id: Uuid) -> ActionResult {
        let tool = match self.service.tools().get_by_id(tool_id).await {
            Ok(Some(tool)) => tool,
            Ok(None) => return ActionResult::failed(tool_id, &SyncError::RecordNotFound(tool_id)),
            Err(e) => return ActionResult::failed(tool_id, &SyncError::from(e)),
        };

        let tracked: Vec<CollectionName> = tool
            .sync_metadata
            .map(|m| m.collections.into_keys().collect())
            .unwrap_or_default();
        if tracked.is_empty() {
            return ActionResult::ok(tool_id, "no sync state to reset");
        }

        let patch = SyncMetadataPatch::for_each(tracked, CollectionPatch::reset_retry());
        match self.service.tools().apply_sync_patch(tool_id, patch).await {
            Ok(()) => ActionResult::ok(tool_id, "retry count reset"),
            Err(e) => ActionResult::failed(tool_id, &SyncError::from(e)),
        }
    }

    /// Force `stale` on every collection so the next sweep resyncs the tool
    /// regardless of hash equality
    #[instrument(skip(self))]
    pub async fn mark_as_stale(&self, tool_id: Uuid) -> ActionResult {
        let patch = SyncMetadataPatch::for_each(CollectionName::ALL, CollectionPatch::stale());
        match self.service.tools().apply_sync_patch(tool_id, patch).await {
            Ok(()) => ActionResult::ok(tool_id, "marked as stale"),
            Err(e) => ActionResult::failed(tool_id, &SyncError::from(e)),
        }
    }

    pub async fn force_retry_batch(&self, ids: &[Uuid]) -> Result<BatchActionResult, SyncError> {
        check_batch(ids)?;
        Ok(self.retry_ids(ids).await)
    }

    pub async fn mark_as_stale_batch(&self, ids: &[Uuid]) -> Result<BatchActionResult, SyncError> {
        check_batch(ids)?;
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            results.push(self.mark_as_stale(id).await);
        }
        Ok(results.into_iter().collect())
    }

    pub async fn status(&self) -> WorkerStatus {
        let state = self.state.read().await;
        WorkerStatus {
            is_running: state.is_running,
            last_sweep_at: state.last_sweep_at,
            last_sweep_duration_ms: state.last_sweep_duration_ms,
            processed_count: state.processed_count,
            success_count: state.success_count,
            failed_count: state.failed_count,
            next_sweep_at: state.next_sweep_at,
            config: self.config.clone(),
        }
    }
}

fn check_batch(ids: &[Uuid]) -> Result<(), SyncError> {
    if ids.len() > MAX_BATCH_IDS {
        return Err(SyncError::Validation(format!(
            "at most {MAX_BATCH_IDS} ids per batch, got {}",
            ids.len()
        )));
    }
    Ok(())
}

fn next_tick(interval: Duration) -> Option<DateTime<Utc>> {
    let interval = TimeDelta::from_std(interval).ok()?;
    Utc::now().checked_add_signed(interval)
}
