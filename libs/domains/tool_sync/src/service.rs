//! Sync orchestrator: drives one tool through content generation, embedding
//! and vector upsert for each collection, then records the outcome in the
//! tool's tracking block with a single field-level update.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use database::RetryPolicy;
use domain_tools::{
    CollectionName, CollectionPatch, SyncMetadata, SyncMetadataPatch, SyncStats, SyncStatus,
    Tool, ToolRepository,
};
use domain_vector::{
    EmbeddingModel, EmbeddingProvider, ErrorKind, Vector, VectorConfig, VectorError,
    VectorRepository,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::content::ContentGeneratorRegistry;
use crate::detector::{self, ChangeClassification};
use crate::error::SyncError;
use crate::metrics;
use crate::models::{
    ActionResult, CollectionDeleteResult, CollectionSyncResult, DeleteResult, SyncOptions,
    SyncOutcome, SyncResult,
};
use crate::payload::build_payload;

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq)]
pub struct SyncServiceConfig {
    pub model: EmbeddingModel,
    /// Attempts per collection within one call
    pub max_retries: u32,
    /// Linear delay unit between attempts
    pub retry_base_delay: Duration,
}

impl Default for SyncServiceConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModel::default(),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
        }
    }
}

impl FromEnv for SyncServiceConfig {
    /// EMBEDDING_MODEL, SYNC_MAX_RETRIES, SYNC_RETRY_BASE_DELAY_MS
    fn from_env() -> Result<Self, ConfigError> {
        let model_name = env_or_default("EMBEDDING_MODEL", "text-embedding-3-small");
        let model = EmbeddingModel::from_name(&model_name).ok_or_else(|| {
            ConfigError::ParseError {
                key: "EMBEDDING_MODEL".to_string(),
                details: format!("unknown embedding model '{model_name}'"),
            }
        })?;

        Ok(Self {
            model,
            max_retries: env_parse("SYNC_MAX_RETRIES", 3)?,
            retry_base_delay: Duration::from_millis(env_parse("SYNC_RETRY_BASE_DELAY_MS", 1000)?),
        })
    }
}

/// Per-collection results and the tracking changes they imply
#[derive(Default)]
struct SyncRun {
    results: Vec<CollectionSyncResult>,
    patch: SyncMetadataPatch,
}

impl SyncRun {
    fn push(&mut self, result: CollectionSyncResult, change: Option<CollectionPatch>) {
        if let Some(change) = change {
            self.patch.set(result.collection, change);
        }
        self.results.push(result);
    }
}

#[derive(Clone)]
pub struct SyncService {
    tools: Arc<dyn ToolRepository>,
    vectors: Arc<dyn VectorRepository>,
    embeddings: Arc<dyn EmbeddingProvider>,
    generators: ContentGeneratorRegistry,
    config: SyncServiceConfig,
}

impl SyncService {
    pub fn new(
        tools: Arc<dyn ToolRepository>,
        vectors: Arc<dyn VectorRepository>,
        embeddings: Arc<dyn EmbeddingProvider>,
        config: SyncServiceConfig,
    ) -> Self {
        Self {
            tools,
            vectors,
            embeddings,
            generators: ContentGeneratorRegistry::default(),
            config,
        }
    }

    pub fn with_generators(mut self, generators: ContentGeneratorRegistry) -> Self {
        self.generators = generators;
        self
    }

    pub fn tools(&self) -> &Arc<dyn ToolRepository> {
        &self.tools
    }

    pub fn config(&self) -> &SyncServiceConfig {
        &self.config
    }

    fn retry_policy(&self, max_attempts: u32) -> RetryPolicy {
        RetryPolicy::linear(max_attempts, self.config.retry_base_delay)
    }

    async fn load(&self, tool_id: Uuid) -> Result<Tool, SyncError> {
        self.tools
            .get_by_id(tool_id)
            .await?
            .ok_or(SyncError::RecordNotFound(tool_id))
    }

    fn validate(tool: &Tool) -> Result<(), SyncError> {
        if tool.name.trim().is_empty() {
            return Err(SyncError::InvalidRecord("tool has no name".to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Full / restricted sync
    // ------------------------------------------------------------------

    /// Sync `tool` into its target collections.
    ///
    /// Without `force`, collections whose fingerprint matches the stored hash
    /// are skipped. Never returns an error: failures are reported per
    /// collection and recorded in the tracking block.
    #[instrument(skip(self, tool, options), fields(tool_id = %tool.id, force = options.force))]
    pub async fn sync_all(&self, tool: &Tool, options: SyncOptions) -> SyncResult {
        let started = Instant::now();
        if let Err(e) = Self::validate(tool) {
            warn!(error = %e, "Refusing to sync invalid tool");
            return SyncResult::error(tool.id, &e, started.elapsed());
        }

        let mut run = SyncRun::default();
        self.sync_collections(tool, &options, &mut run).await;
        self.finish(tool.id, run, started).await
    }

    /// Load a tool and sync it
    pub async fn sync_by_id(&self, tool_id: Uuid, options: SyncOptions) -> SyncResult {
        match self.load(tool_id).await {
            Ok(tool) => self.sync_all(&tool, options).await,
            Err(e) => SyncResult::error(tool_id, &e, Duration::ZERO),
        }
    }

    async fn sync_collections(&self, tool: &Tool, options: &SyncOptions, run: &mut SyncRun) {
        let policy = self.retry_policy(options.max_retries.unwrap_or(self.config.max_retries));

        for collection in options.targets() {
            if !options.force && !detector::needs_sync(tool, collection) {
                debug!(collection = %collection, "Content unchanged, skipping");
                run.push(CollectionSyncResult::skipped(collection), None);
                continue;
            }

            let content_hash = detector::fingerprint(tool, collection);
            let (outcome, attempts) = policy
                .run(
                    move |attempt| self.sync_collection(tool, collection, attempt),
                    SyncError::is_retryable,
                )
                .await;
            let now = Utc::now();

            match outcome {
                Ok(()) => run.push(
                    CollectionSyncResult::synced(collection, content_hash.clone(), attempts),
                    Some(CollectionPatch::succeeded(content_hash, now)),
                ),
                Err(e) => {
                    warn!(
                        collection = %collection,
                        attempts,
                        error = %e,
                        error_code = %e.code(),
                        "Collection sync failed"
                    );
                    run.push(
                        CollectionSyncResult::failed(collection, &e, attempts),
                        Some(CollectionPatch::failed(e.to_string(), e.code(), now)),
                    );
                }
            }
        }
    }

    /// One attempt: generate, embed, upsert
    async fn sync_collection(
        &self,
        tool: &Tool,
        collection: CollectionName,
        attempt: u32,
    ) -> Result<(), SyncError> {
        let content = self.generators.generate(tool, collection)?;

        metrics::record_embedding_call();
        let embedding = self
            .embeddings
            .embed(self.config.model, &content)
            .await
            .map_err(SyncError::Embedding)?;
        if embedding.values.is_empty() {
            return Err(SyncError::Embedding(VectorError::embedding(
                ErrorKind::Other,
                "provider returned an empty vector",
            )));
        }

        let vector =
            Vector::new(tool.id, embedding.values).with_payload(build_payload(tool, collection));
        self.vectors
            .upsert(collection.as_str(), vector)
            .await
            .map_err(SyncError::VectorUpsert)?;

        debug!(collection = %collection, attempt, "Collection synced");
        Ok(())
    }

    /// Record metrics, persist the tracking changes, build the result
    async fn finish(&self, tool_id: Uuid, run: SyncRun, started: Instant) -> SyncResult {
        for result in &run.results {
            metrics::record_collection_outcome(result.collection, result.outcome);
        }

        let metadata_persisted = self.persist(tool_id, run.patch).await;
        let result =
            SyncResult::from_collections(tool_id, run.results, started.elapsed(), metadata_persisted);

        info!(
            tool_id = %tool_id,
            synced = result.synced_count,
            failed = result.failed_count,
            skipped = result.skipped_count,
            duration_ms = result.duration_ms,
            "Tool sync finished"
        );
        result
    }

    /// Apply the tracking changes; a failure is logged and reported, never
    /// turned into a collection failure.
    async fn persist(&self, tool_id: Uuid, patch: SyncMetadataPatch) -> bool {
        if patch.is_empty() {
            return true;
        }

        match self.tools.apply_sync_patch(tool_id, patch).await {
            Ok(()) => true,
            Err(e) => {
                let e = SyncError::MetadataPersist(e.to_string());
                warn!(
                    tool_id = %tool_id,
                    error = %e,
                    error_code = %e.code(),
                    "Vector store updated but sync metadata was not persisted"
                );
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Change-driven sync
    // ------------------------------------------------------------------

    /// Sync only what `changed_fields` affects.
    ///
    /// Edits to payload fields alone refresh payloads without embedding;
    /// unmapped fields are a no-op. When a payload field changes alongside
    /// embedded ones, collections that are not re-upserted get their payload
    /// rewritten.
    #[instrument(skip(self, tool, changed_fields), fields(tool_id = %tool.id))]
    pub async fn sync_affected<S: AsRef<str>>(&self, tool: &Tool, changed_fields: &[S]) -> SyncResult {
        let change = detector::classify_change(changed_fields);
        self.sync_classified(tool, &change).await
    }

    /// Diff two versions of a tool and sync what changed
    pub async fn sync_changes(&self, previous: &Tool, current: &Tool) -> SyncResult {
        let change = detector::classify_fields(&previous.changed_fields(current));
        self.sync_classified(current, &change).await
    }

    async fn sync_classified(&self, tool: &Tool, change: &ChangeClassification) -> SyncResult {
        if change.metadata_only {
            return self.update_payload_only(tool).await;
        }
        if change.affected_collections.is_empty() {
            debug!(tool_id = %tool.id, "No indexed field changed");
            return SyncResult::noop(tool.id, &CollectionName::ALL);
        }

        let started = Instant::now();
        if let Err(e) = Self::validate(tool) {
            return SyncResult::error(tool.id, &e, started.elapsed());
        }

        let mut run = SyncRun::default();
        let options =
            SyncOptions::default().only(change.affected_collections.iter().copied());
        self.sync_collections(tool, &options, &mut run).await;

        if change.touches_metadata {
            // Upserted collections already carry the new payload
            let mut stale_payloads = change.unaffected_collections();
            run.results.retain(|r| {
                let skipped = r.outcome == SyncOutcome::Skipped;
                if skipped {
                    stale_payloads.push(r.collection);
                }
                !skipped
            });
            stale_payloads.sort();
            self.refresh_payloads(tool, &stale_payloads, &mut run).await;
            run.results.sort_by_key(|r| r.collection);
        }

        self.finish(tool.id, run, started).await
    }

    // ------------------------------------------------------------------
    // Payload-only refresh
    // ------------------------------------------------------------------

    /// Rewrite the stored payload of every collection that already holds a
    /// vector. Hashes are left alone since embedded content is unchanged.
    #[instrument(skip(self, tool), fields(tool_id = %tool.id))]
    pub async fn update_payload_only(&self, tool: &Tool) -> SyncResult {
        let started = Instant::now();
        let mut run = SyncRun::default();
        self.refresh_payloads(tool, &CollectionName::ALL, &mut run)
            .await;
        self.finish(tool.id, run, started).await
    }

    async fn refresh_payloads(
        &self,
        tool: &Tool,
        collections: &[CollectionName],
        run: &mut SyncRun,
    ) {
        let policy = self.retry_policy(self.config.max_retries);

        for &collection in collections {
            let has_vector = tool
                .sync_metadata
                .as_ref()
                .and_then(|m| m.content_hash(collection))
                .is_some();
            if !has_vector {
                run.push(CollectionSyncResult::skipped(collection), None);
                continue;
            }

            let (outcome, attempts) = policy
                .run(
                    move |_| self.update_collection_payload(tool, collection),
                    SyncError::is_retryable,
                )
                .await;
            let now = Utc::now();

            match outcome {
                Ok(()) => run.push(
                    CollectionSyncResult::payload_updated(collection, attempts),
                    Some(CollectionPatch::payload_refreshed(now)),
                ),
                Err(e) => {
                    warn!(
                        collection = %collection,
                        error = %e,
                        "Payload update failed, collection left for the next sweep"
                    );
                    run.push(
                        CollectionSyncResult::failed(collection, &e, attempts),
                        Some(CollectionPatch::payload_failed(e.to_string(), e.code(), now)),
                    );
                }
            }
        }
    }

    async fn update_collection_payload(
        &self,
        tool: &Tool,
        collection: CollectionName,
    ) -> Result<(), SyncError> {
        self.vectors
            .update_payload(collection.as_str(), tool.id, build_payload(tool, collection))
            .await
            .map_err(SyncError::VectorUpsert)
    }

    // ------------------------------------------------------------------
    // Delete / retry
    // ------------------------------------------------------------------

    /// Remove the tool's vector from every collection. Missing points count
    /// as deleted; other failures are reported for a manual retry.
    #[instrument(skip(self))]
    pub async fn delete_everywhere(&self, tool_id: Uuid) -> DeleteResult {
        let policy = self.retry_policy(self.config.max_retries);
        let mut collections = Vec::with_capacity(CollectionName::ALL.len());

        for collection in CollectionName::ALL {
            let (outcome, _) = policy
                .run(
                    move |_| self.delete_from(collection, tool_id),
                    SyncError::is_retryable,
                )
                .await;

            let error = outcome.err().map(|e| {
                warn!(collection = %collection, error = %e, "Vector delete failed");
                e.to_string()
            });
            collections.push(CollectionDeleteResult {
                collection,
                success: error.is_none(),
                error,
            });
        }

        let success = collections.iter().all(|c| c.success);
        info!(tool_id = %tool_id, success, "Tool removed from vector collections");
        DeleteResult {
            tool_id,
            success,
            collections,
        }
    }

    async fn delete_from(&self, collection: CollectionName, tool_id: Uuid) -> Result<(), SyncError> {
        match self.vectors.delete(collection.as_str(), tool_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(collection = %collection, "Vector already absent");
                Ok(())
            }
            Err(e) => Err(SyncError::VectorDelete(e)),
        }
    }

    /// Force-sync every failed, pending or stale collection of a tool
    #[instrument(skip(self))]
    pub async fn retry_failed(&self, tool_id: Uuid) -> SyncResult {
        match self.load(tool_id).await {
            Ok(tool) => self.sync_unsynced(&tool).await,
            Err(e) => SyncResult::error(tool_id, &e, Duration::ZERO),
        }
    }

    /// Force-sync the collections of `tool` that are not `synced`.
    /// Tools without a tracking block sync every collection.
    pub async fn sync_unsynced(&self, tool: &Tool) -> SyncResult {
        let targets = match tool.sync_metadata {
            Some(ref metadata) => metadata.collections_with_status(&[
                SyncStatus::Failed,
                SyncStatus::Pending,
                SyncStatus::Stale,
            ]),
            None => CollectionName::ALL.to_vec(),
        };

        if targets.is_empty() {
            return SyncResult::noop(tool.id, &[]);
        }

        self.sync_all(tool, SyncOptions::forced().only(targets)).await
    }

    // ------------------------------------------------------------------
    // Status and administration
    // ------------------------------------------------------------------

    /// Stored tracking block; `None` when the tool was never made eligible
    pub async fn sync_status(&self, tool_id: Uuid) -> Result<Option<SyncMetadata>, SyncError> {
        Ok(self.load(tool_id).await?.sync_metadata)
    }

    pub async fn stats(&self) -> Result<SyncStats, SyncError> {
        Ok(self.tools.sync_stats().await?)
    }

    /// Create `pending` entries for every collection the tool does not track yet
    #[instrument(skip(self))]
    pub async fn initialize_sync_metadata(&self, tool_id: Uuid) -> ActionResult {
        let tool = match self.load(tool_id).await {
            Ok(tool) => tool,
            Err(e) => return ActionResult::failed(tool_id, &e),
        };
        if !tool.is_eligible() {
            let e = SyncError::Validation(format!("tool is {}, not approved", tool.status));
            return ActionResult::failed(tool_id, &e);
        }

        let missing: Vec<CollectionName> = CollectionName::ALL
            .iter()
            .copied()
            .filter(|c| {
                tool.sync_metadata
                    .as_ref()
                    .and_then(|m| m.collection(*c))
                    .is_none()
            })
            .collect();
        if missing.is_empty() {
            return ActionResult::ok(tool_id, "sync metadata already initialized");
        }

        let count = missing.len();
        let patch = SyncMetadataPatch::for_each(missing, CollectionPatch::reset_pending());
        match self.tools.apply_sync_patch(tool_id, patch).await {
            Ok(()) => ActionResult::ok(tool_id, format!("initialized {count} collections")),
            Err(e) => ActionResult::failed(tool_id, &SyncError::from(e)),
        }
    }

    /// Administrative re-seed: empty the vector collection and mark it
    /// `pending` with no hash on every approved tool.
    #[instrument(skip(self))]
    pub async fn reset_collection(&self, collection: CollectionName) -> Result<u64, SyncError> {
        self.vectors
            .clear_collection(collection.as_str())
            .await
            .map_err(SyncError::VectorDelete)?;
        let reset = self.tools.reset_collection_state(collection).await?;

        warn!(collection = %collection, tools = reset, "Collection reset for re-seed");
        Ok(reset)
    }

    /// Create missing vector collections; returns the ones created
    pub async fn ensure_collections(&self, dimension: u32) -> Result<Vec<CollectionName>, SyncError> {
        let mut created = Vec::new();
        for collection in CollectionName::ALL {
            let was_created = self
                .vectors
                .ensure_collection(collection.as_str(), VectorConfig::new(dimension))
                .await
                .map_err(SyncError::VectorUpsert)?;
            if was_created {
                created.push(collection);
            }
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MockContentGenerator;
    use crate::test_support::{Harness, approved_tool};
    use domain_tools::SyncErrorCode;

    #[tokio::test]
    async fn test_full_sync_of_unsynced_tool() {
        let tool = approved_tool("ripgrep");
        let h = Harness::new([tool.clone()]);

        let result = h.service.sync_all(&tool, SyncOptions::forced()).await;

        assert!(result.success);
        assert_eq!(result.synced_count, 4);
        assert!(result.metadata_persisted);
        assert_eq!(h.embeddings.calls(), 4);

        let metadata = h.metadata(tool.id);
        assert_eq!(metadata.overall_status, SyncStatus::Synced);
        for collection in CollectionName::ALL {
            let state = metadata.collection(collection).unwrap();
            assert_eq!(state.retry_count, 0);
            assert_eq!(
                state.content_hash.as_deref(),
                Some(detector::fingerprint(&tool, collection).as_str())
            );
            let point = h.vectors.point(collection, tool.id).unwrap();
            assert_eq!(point.payload.unwrap()["collection"], collection.as_str());
        }
    }

    #[tokio::test]
    async fn test_second_sync_skips_everything() {
        let tool = approved_tool("fd");
        let h = Harness::new([tool.clone()]);

        h.service.sync_all(&tool, SyncOptions::default()).await;
        let reloaded = h.tool(tool.id);
        let second = h.service.sync_all(&reloaded, SyncOptions::default()).await;

        assert!(second.success);
        assert_eq!(second.skipped_count, 4);
        assert_eq!(h.embeddings.calls(), 4);
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let tool = approved_tool("bat");
        let h = Harness::new([tool.clone()]);
        h.vectors
            .fail(CollectionName::Functionality, [ErrorKind::Validation]);

        let result = h
            .service
            .sync_all(
                &tool,
                SyncOptions::forced().only([CollectionName::Tools, CollectionName::Functionality]),
            )
            .await;

        assert_eq!(result.synced_count, 1);
        assert_eq!(result.failed_count, 1);
        assert!(!result.success);

        let failed = result.collection(CollectionName::Functionality).unwrap();
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.error_code, Some(SyncErrorCode::VectorUpsertFailed));

        let metadata = h.metadata(tool.id);
        assert_eq!(metadata.status_of(CollectionName::Tools), SyncStatus::Synced);
        assert_eq!(metadata.status_of(CollectionName::Functionality), SyncStatus::Failed);
        assert_eq!(metadata.overall_status, SyncStatus::Failed);
        assert_eq!(
            metadata
                .collection(CollectionName::Functionality)
                .unwrap()
                .retry_count,
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried_with_linear_delay() {
        let tool = approved_tool("jq");
        let h = Harness::new([tool.clone()]);
        h.embeddings
            .fail_next([ErrorKind::Timeout, ErrorKind::RateLimited]);

        let start = tokio::time::Instant::now();
        let result = h
            .service
            .sync_all(&tool, SyncOptions::forced().only([CollectionName::Tools]))
            .await;

        assert!(result.success);
        assert_eq!(result.collections[0].attempts, 3);
        // 1s after the first attempt, 2s after the second
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(h.metadata(tool.id).collection(CollectionName::Tools).unwrap().retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_increment_retry_count_once_per_call() {
        let tool = approved_tool("htop");
        let h = Harness::new([tool.clone()]);
        let only_usecases = SyncOptions::forced().only([CollectionName::Usecases]);

        h.embeddings.fail_next([ErrorKind::Connection; 3]);
        let first = h.service.sync_all(&tool, only_usecases.clone()).await;
        assert_eq!(first.collections[0].attempts, 3);
        assert_eq!(first.collections[0].error_code, Some(SyncErrorCode::EmbeddingFailed));

        h.embeddings.fail_next([ErrorKind::Connection; 3]);
        h.service.sync_all(&tool, only_usecases).await;

        let state = h
            .metadata(tool.id)
            .collection(CollectionName::Usecases)
            .cloned()
            .unwrap();
        assert_eq!(state.status, SyncStatus::Failed);
        assert_eq!(state.retry_count, 2);
        assert_eq!(state.content_hash, None);
        assert!(state.last_error.unwrap().contains("connection"));
    }

    #[tokio::test]
    async fn test_empty_content_fails_without_embedding() {
        let tool = approved_tool("exa");
        let h = Harness::new([tool.clone()]);

        let mut blank = MockContentGenerator::new();
        blank.expect_generate().times(1).returning(|_| String::new());
        let service = (*h.service).clone().with_generators(
            ContentGeneratorRegistry::default()
                .with_generator(CollectionName::Interface, Arc::new(blank)),
        );

        let result = service.sync_all(&tool, SyncOptions::forced()).await;

        assert_eq!(result.synced_count, 3);
        let interface = result.collection(CollectionName::Interface).unwrap();
        assert_eq!(interface.outcome, SyncOutcome::Failed);
        assert_eq!(interface.attempts, 1);
        assert_eq!(
            interface.error_code,
            Some(SyncErrorCode::ContentGenerationFailed)
        );
        assert_eq!(h.embeddings.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalid_tool_is_rejected_before_any_work() {
        let mut tool = approved_tool("nameless");
        tool.name = "  ".to_string();
        let h = Harness::new([tool.clone()]);

        let result = h.service.sync_all(&tool, SyncOptions::forced()).await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(SyncErrorCode::InvalidRecordData));
        assert_eq!(h.embeddings.calls(), 0);
        assert_eq!(h.tools.patch_calls(), 0);
    }

    #[tokio::test]
    async fn test_metadata_only_edit_refreshes_payloads() {
        let tool = approved_tool("zoxide");
        let h = Harness::new([tool.clone()]);
        h.service.sync_all(&tool, SyncOptions::forced()).await;
        let before = h.metadata(tool.id);

        let mut edited = h.tool(tool.id);
        edited.website_url = Some("https://zoxide.dev".to_string());
        let result = h.service.sync_affected(&edited, &["website_url"]).await;

        assert!(result.success);
        assert!(result
            .collections
            .iter()
            .all(|c| c.outcome == SyncOutcome::PayloadUpdated));
        assert_eq!(h.embeddings.calls(), 4);

        let after = h.metadata(tool.id);
        assert_eq!(after.overall_status, SyncStatus::Synced);
        for collection in CollectionName::ALL {
            assert_eq!(after.content_hash(collection), before.content_hash(collection));
            let payload = h.vectors.point(collection, tool.id).unwrap().payload.unwrap();
            assert_eq!(payload["website_url"], "https://zoxide.dev");
        }
    }

    #[tokio::test]
    async fn test_semantic_edit_resyncs_only_affected_collection() {
        let tool = approved_tool("tokei");
        let h = Harness::new([tool.clone()]);
        h.service.sync_all(&tool, SyncOptions::forced()).await;
        let before = h.metadata(tool.id);

        let mut edited = h.tool(tool.id);
        edited.functionality.push("line counting".to_string());
        let result = h.service.sync_affected(&edited, &["functionality"]).await;

        assert_eq!(result.collections.len(), 1);
        assert_eq!(result.synced_count, 1);
        assert_eq!(h.embeddings.calls(), 5);

        let after = h.metadata(tool.id);
        assert_ne!(
            after.content_hash(CollectionName::Functionality),
            before.content_hash(CollectionName::Functionality)
        );
        for collection in [
            CollectionName::Tools,
            CollectionName::Usecases,
            CollectionName::Interface,
        ] {
            assert_eq!(after.collection(collection), before.collection(collection));
        }
    }

    #[tokio::test]
    async fn test_mixed_edit_refreshes_unaffected_payloads() {
        let tool = approved_tool("delta");
        let h = Harness::new([tool.clone()]);
        h.service.sync_all(&tool, SyncOptions::forced()).await;

        let previous = h.tool(tool.id);
        let mut edited = previous.clone();
        edited.tags.push("diff".to_string());
        edited.logo_url = Some("https://example.com/delta.png".to_string());

        let result = h.service.sync_changes(&previous, &edited).await;

        let outcomes: Vec<(CollectionName, SyncOutcome)> = result
            .collections
            .iter()
            .map(|c| (c.collection, c.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                (CollectionName::Tools, SyncOutcome::Synced),
                (CollectionName::Functionality, SyncOutcome::PayloadUpdated),
                (CollectionName::Usecases, SyncOutcome::Synced),
                (CollectionName::Interface, SyncOutcome::PayloadUpdated),
            ]
        );
        assert_eq!(h.embeddings.calls(), 6);
        assert_eq!(h.tools.patch_calls(), 2);
    }

    #[tokio::test]
    async fn test_category_edit_rewrites_every_payload() {
        let mut tool = approved_tool("eza");
        tool.category = "old-cat".to_string();
        let h = Harness::new([tool.clone()]);
        h.service.sync_all(&tool, SyncOptions::forced()).await;
        let before = h.metadata(tool.id);

        let mut edited = h.tool(tool.id);
        edited.category = "new-cat".to_string();
        let result = h.service.sync_affected(&edited, &["category"]).await;

        let outcomes: Vec<(CollectionName, SyncOutcome)> = result
            .collections
            .iter()
            .map(|c| (c.collection, c.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                (CollectionName::Tools, SyncOutcome::Synced),
                (CollectionName::Functionality, SyncOutcome::PayloadUpdated),
                (CollectionName::Usecases, SyncOutcome::PayloadUpdated),
                (CollectionName::Interface, SyncOutcome::PayloadUpdated),
            ]
        );
        assert_eq!(h.embeddings.calls(), 5);

        let after = h.metadata(tool.id);
        for collection in CollectionName::ALL {
            let payload = h.vectors.point(collection, tool.id).unwrap().payload.unwrap();
            assert_eq!(payload["category"], "new-cat", "{collection}");
            if collection != CollectionName::Tools {
                assert_eq!(after.content_hash(collection), before.content_hash(collection));
            }
        }
    }

    #[tokio::test]
    async fn test_unchanged_affected_collections_still_get_new_payload() {
        let tool = approved_tool("procs");
        let h = Harness::new([tool.clone()]);
        h.service.sync_all(&tool, SyncOptions::forced()).await;

        // Tags are listed as changed but hold the same value
        let mut edited = h.tool(tool.id);
        edited.logo_url = Some("https://example.com/procs.png".to_string());
        let result = h.service.sync_affected(&edited, &["tags", "logo_url"]).await;

        assert!(result.success);
        assert_eq!(result.collections.len(), 4);
        assert!(result
            .collections
            .iter()
            .all(|c| c.outcome == SyncOutcome::PayloadUpdated));
        assert_eq!(h.embeddings.calls(), 4);

        for collection in CollectionName::ALL {
            let payload = h.vectors.point(collection, tool.id).unwrap().payload.unwrap();
            assert_eq!(payload["logo_url"], "https://example.com/procs.png", "{collection}");
        }
    }

    #[tokio::test]
    async fn test_unmapped_edit_is_a_noop() {
        let tool = approved_tool("dust");
        let h = Harness::new([tool.clone()]);

        let result = h.service.sync_affected(&tool, &["updated_at", "created_by"]).await;
        assert!(result.success);
        assert_eq!(result.skipped_count, 4);
        assert_eq!(h.tools.patch_calls(), 0);
        assert_eq!(h.embeddings.calls(), 0);
    }

    #[tokio::test]
    async fn test_payload_failure_marks_collection_pending() {
        let tool = approved_tool("bottom");
        let h = Harness::new([tool.clone()]);
        h.service.sync_all(&tool, SyncOptions::forced()).await;
        h.vectors.fail(CollectionName::Interface, [ErrorKind::Validation]);

        let synced = h.tool(tool.id);
        let result = h.service.update_payload_only(&synced).await;
        assert_eq!(result.failed_count, 1);

        let metadata = h.metadata(tool.id);
        let interface = metadata.collection(CollectionName::Interface).unwrap();
        assert_eq!(interface.status, SyncStatus::Pending);
        assert_eq!(interface.retry_count, 0);
        assert_eq!(
            interface.content_hash.as_deref(),
            Some(detector::fingerprint(&synced, CollectionName::Interface).as_str())
        );
        assert_eq!(metadata.overall_status, SyncStatus::Pending);
    }

    #[tokio::test]
    async fn test_payload_refresh_skips_collections_without_vector() {
        let tool = approved_tool("sd");
        let h = Harness::new([tool.clone()]);

        let result = h.service.update_payload_only(&tool).await;
        assert_eq!(result.skipped_count, 4);
        assert_eq!(h.vectors.payload_updates(), 0);
    }

    #[tokio::test]
    async fn test_metadata_persist_failure_does_not_fail_collections() {
        let tool = approved_tool("broot");
        let h = Harness::new([tool.clone()]);
        h.tools.fail_next_patches(1);

        let result = h.service.sync_all(&tool, SyncOptions::forced()).await;

        assert!(result.success);
        assert!(!result.metadata_persisted);
        assert_eq!(result.synced_count, 4);
        assert!(h.vectors.point(CollectionName::Tools, tool.id).is_some());
        assert!(h.tool(tool.id).sync_metadata.is_none());
    }

    #[tokio::test]
    async fn test_delete_everywhere_reports_partial_failure() {
        let tool = approved_tool("procs");
        let h = Harness::new([tool.clone()]);
        h.service.sync_all(&tool, SyncOptions::forced()).await;
        h.vectors.fail(CollectionName::Usecases, [ErrorKind::Validation]);

        let result = h.service.delete_everywhere(tool.id).await;

        assert!(!result.success);
        let failed: Vec<CollectionName> = result
            .collections
            .iter()
            .filter(|c| !c.success)
            .map(|c| c.collection)
            .collect();
        assert_eq!(failed, vec![CollectionName::Usecases]);
        assert!(h.vectors.point(CollectionName::Tools, tool.id).is_none());
        assert!(h.vectors.point(CollectionName::Usecases, tool.id).is_some());
    }

    #[tokio::test]
    async fn test_delete_of_missing_vectors_succeeds() {
        let h = Harness::empty();
        let result = h.service.delete_everywhere(Uuid::now_v7()).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_retry_failed_targets_unsynced_collections() {
        let tool = approved_tool("hyperfine");
        let h = Harness::new([tool.clone()]);
        h.vectors.fail(CollectionName::Interface, [ErrorKind::NotFound]);
        h.service.sync_all(&tool, SyncOptions::forced()).await;
        assert_eq!(h.embeddings.calls(), 4);

        let result = h.service.retry_failed(tool.id).await;

        assert!(result.success);
        assert_eq!(result.collections.len(), 1);
        assert_eq!(result.collections[0].collection, CollectionName::Interface);
        assert_eq!(h.embeddings.calls(), 5);
        assert_eq!(h.metadata(tool.id).overall_status, SyncStatus::Synced);

        let noop = h.service.retry_failed(tool.id).await;
        assert!(noop.success);
        assert!(noop.collections.is_empty());
    }

    #[tokio::test]
    async fn test_retry_failed_unknown_tool() {
        let h = Harness::empty();
        let result = h.service.retry_failed(Uuid::now_v7()).await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(SyncErrorCode::RecordNotFound));
    }

    #[tokio::test]
    async fn test_initialize_sync_metadata() {
        let tool = approved_tool("fzf");
        let mut draft = approved_tool("draft");
        draft.status = domain_tools::ToolStatus::Draft;
        let h = Harness::new([tool.clone(), draft.clone()]);

        let result = h.service.initialize_sync_metadata(tool.id).await;
        assert!(result.success);
        let metadata = h.metadata(tool.id);
        assert_eq!(metadata.collections.len(), 4);
        assert_eq!(metadata.overall_status, SyncStatus::Pending);

        let again = h.service.initialize_sync_metadata(tool.id).await;
        assert!(again.success);
        assert_eq!(h.tools.patch_calls(), 1);

        let rejected = h.service.initialize_sync_metadata(draft.id).await;
        assert!(!rejected.success);
        assert_eq!(rejected.error_code, Some(SyncErrorCode::ValidationFailed));
    }

    #[tokio::test]
    async fn test_reset_collection_clears_vectors_and_hashes() {
        let tool = approved_tool("eza");
        let h = Harness::new([tool.clone()]);
        h.service.sync_all(&tool, SyncOptions::forced()).await;

        let reset = h.service.reset_collection(CollectionName::Tools).await.unwrap();
        assert_eq!(reset, 1);
        assert!(h.vectors.point(CollectionName::Tools, tool.id).is_none());

        let metadata = h.metadata(tool.id);
        assert_eq!(metadata.content_hash(CollectionName::Tools), None);
        assert_eq!(metadata.overall_status, SyncStatus::Pending);

        let stats = h.service.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
    }

    #[tokio::test]
    async fn test_sync_status_and_ensure_collections() {
        let tool = approved_tool("starship");
        let h = Harness::new([tool.clone()]);

        assert_eq!(h.service.sync_status(tool.id).await.unwrap(), None);
        assert!(matches!(
            h.service.sync_status(Uuid::now_v7()).await,
            Err(SyncError::RecordNotFound(_))
        ));

        let created = h.service.ensure_collections(3).await.unwrap();
        assert_eq!(created, CollectionName::ALL.to_vec());
        assert!(h.service.ensure_collections(3).await.unwrap().is_empty());
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("EMBEDDING_MODEL", Some("text-embedding-3-large")),
                ("SYNC_MAX_RETRIES", Some("5")),
                ("SYNC_RETRY_BASE_DELAY_MS", None),
            ],
            || {
                let config = SyncServiceConfig::from_env().unwrap();
                assert_eq!(config.model, EmbeddingModel::TextEmbedding3Large);
                assert_eq!(config.max_retries, 5);
                assert_eq!(config.retry_base_delay, Duration::from_secs(1));
            },
        );

        temp_env::with_var("EMBEDDING_MODEL", Some("word2vec"), || {
            assert!(SyncServiceConfig::from_env().is_err());
        });
    }
}
