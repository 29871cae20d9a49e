//! In-process fakes for the vector store and the embedding provider

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain_tools::{CollectionName, InMemoryToolRepository, SyncMetadata, Tool, ToolStatus};
use domain_vector::{
    EmbeddingModel, EmbeddingProvider, EmbeddingProviderType, EmbeddingResult, ErrorKind, Vector,
    VectorConfig, VectorError, VectorRepository, VectorResult,
};
use uuid::Uuid;

use crate::service::{SyncService, SyncServiceConfig};

pub(crate) fn approved_tool(slug: &str) -> Tool {
    let mut tool = Tool::new(slug, slug);
    tool.status = ToolStatus::Approved;
    tool.description = format!("{slug} command line tool");
    tool.category = "cli".to_string();
    tool.tags = vec!["terminal".to_string()];
    tool.functionality = vec!["fast".to_string()];
    tool.use_cases = vec!["daily work".to_string()];
    tool.interface = vec!["cli".to_string()];
    tool.deployment = vec!["local".to_string()];
    tool
}

#[derive(Default)]
pub(crate) struct FakeEmbeddings {
    calls: AtomicUsize,
    failures: Mutex<VecDeque<ErrorKind>>,
    delay: Option<Duration>,
}

impl FakeEmbeddings {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Fail the next calls with these kinds, in order
    pub(crate) fn fail_next(&self, kinds: impl IntoIterator<Item = ErrorKind>) {
        self.failures.lock().unwrap().extend(kinds);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddings {
    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Local
    }

    async fn embed(&self, _model: EmbeddingModel, text: &str) -> VectorResult<EmbeddingResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().unwrap().pop_front();
        if let Some(kind) = failure {
            return Err(VectorError::embedding(kind, format!("injected {kind}")));
        }
        let len = text.len() as f32;
        Ok(EmbeddingResult::new(vec![len, 1.0, 0.5]))
    }

    async fn embed_batch(
        &self,
        model: EmbeddingModel,
        texts: &[String],
    ) -> VectorResult<Vec<EmbeddingResult>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(model, text).await?);
        }
        Ok(results)
    }
}

#[derive(Default)]
pub(crate) struct FakeVectorStore {
    points: Mutex<HashMap<(String, Uuid), Vector>>,
    collections: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, VecDeque<ErrorKind>>>,
    upserts: AtomicUsize,
    payload_updates: AtomicUsize,
}

impl FakeVectorStore {
    /// Fail the next upsert/update/delete calls on `collection`
    pub(crate) fn fail(
        &self,
        collection: CollectionName,
        kinds: impl IntoIterator<Item = ErrorKind>,
    ) {
        self.failures
            .lock()
            .unwrap()
            .entry(collection.as_str().to_string())
            .or_default()
            .extend(kinds);
    }

    pub(crate) fn point(&self, collection: CollectionName, id: Uuid) -> Option<Vector> {
        self.points
            .lock()
            .unwrap()
            .get(&(collection.as_str().to_string(), id))
            .cloned()
    }

    pub(crate) fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub(crate) fn payload_updates(&self) -> usize {
        self.payload_updates.load(Ordering::SeqCst)
    }

    fn injected(&self, collection: &str) -> VectorResult<()> {
        let next = self
            .failures
            .lock()
            .unwrap()
            .get_mut(collection)
            .and_then(VecDeque::pop_front);
        match next {
            Some(kind) => Err(VectorError::qdrant(kind, format!("injected {kind}"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VectorRepository for FakeVectorStore {
    async fn ensure_collection(&self, collection: &str, _config: VectorConfig) -> VectorResult<bool> {
        Ok(self.collections.lock().unwrap().insert(collection.to_string()))
    }

    async fn upsert(&self, collection: &str, vector: Vector) -> VectorResult<Uuid> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.injected(collection)?;
        let id = vector.id;
        self.points
            .lock()
            .unwrap()
            .insert((collection.to_string(), id), vector);
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> VectorResult<()> {
        self.injected(collection)?;
        self.points
            .lock()
            .unwrap()
            .remove(&(collection.to_string(), id))
            .map(|_| ())
            .ok_or_else(|| VectorError::qdrant(ErrorKind::NotFound, "no such point"))
    }

    async fn update_payload(
        &self,
        collection: &str,
        id: Uuid,
        payload: serde_json::Value,
    ) -> VectorResult<()> {
        self.payload_updates.fetch_add(1, Ordering::SeqCst);
        self.injected(collection)?;
        let mut points = self.points.lock().unwrap();
        let point = points
            .get_mut(&(collection.to_string(), id))
            .ok_or_else(|| VectorError::qdrant(ErrorKind::NotFound, "no such point"))?;
        point.payload = Some(payload);
        Ok(())
    }

    async fn clear_collection(&self, collection: &str) -> VectorResult<()> {
        self.points
            .lock()
            .unwrap()
            .retain(|(c, _), _| c != collection);
        Ok(())
    }
}

/// Service wired to in-memory collaborators
pub(crate) struct Harness {
    pub tools: Arc<InMemoryToolRepository>,
    pub vectors: Arc<FakeVectorStore>,
    pub embeddings: Arc<FakeEmbeddings>,
    pub service: Arc<SyncService>,
}

impl Harness {
    pub(crate) fn new(tools: impl IntoIterator<Item = Tool>) -> Self {
        Self::with_embeddings(tools, FakeEmbeddings::default())
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn with_embeddings(
        tools: impl IntoIterator<Item = Tool>,
        embeddings: FakeEmbeddings,
    ) -> Self {
        let tools = Arc::new(InMemoryToolRepository::with_tools(tools));
        let vectors = Arc::new(FakeVectorStore::default());
        let embeddings = Arc::new(embeddings);
        let service = Arc::new(SyncService::new(
            tools.clone(),
            vectors.clone(),
            embeddings.clone(),
            SyncServiceConfig::default(),
        ));

        Self {
            tools,
            vectors,
            embeddings,
            service,
        }
    }

    pub(crate) fn tool(&self, id: Uuid) -> Tool {
        self.tools.get(id).expect("tool exists")
    }

    pub(crate) fn metadata(&self, id: Uuid) -> SyncMetadata {
        self.tool(id).sync_metadata.expect("sync metadata exists")
    }
}
