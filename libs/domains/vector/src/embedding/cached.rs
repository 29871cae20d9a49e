//! Embedding cache in front of a provider.
//!
//! Keys are SHA-256 digests of model name and text, values are the embedding
//! results. Identical content across tools or collections is embedded once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;
use crate::error::VectorResult;
use crate::models::{EmbeddingModel, EmbeddingProviderType, EmbeddingResult};

pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Cache<String, EmbeddingResult>,
}

impl CachedEmbeddingProvider {
    /// Wrap `inner` with a cache holding at most `max_entries` embeddings
    pub fn new(inner: Arc<dyn EmbeddingProvider>, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_idle(Duration::from_secs(3600))
            .build();

        Self { inner, cache }
    }

    fn key(model: EmbeddingModel, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.model_name().as_bytes());
        hasher.update([0u8]);
        hasher.update(model.dimension().to_le_bytes());
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Number of entries currently in the cache
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbeddingProvider {
    fn provider_type(&self) -> EmbeddingProviderType {
        self.inner.provider_type()
    }

    async fn embed(&self, model: EmbeddingModel, text: &str) -> VectorResult<EmbeddingResult> {
        let key = Self::key(model, text);
        if let Some(hit) = self.cache.get(&key).await {
            tracing::trace!("Embedding cache hit");
            return Ok(hit);
        }

        let result = self.inner.embed(model, text).await?;
        self.cache.insert(key, result.clone()).await;
        Ok(result)
    }

    async fn embed_batch(
        &self,
        model: EmbeddingModel,
        texts: &[String],
    ) -> VectorResult<Vec<EmbeddingResult>> {
        let mut results: Vec<Option<EmbeddingResult>> = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let hit = self.cache.get(&Self::key(model, text)).await;
            if hit.is_none() {
                missing.push(i);
            }
            results.push(hit);
        }

        if !missing.is_empty() {
            let to_embed: Vec<String> = missing.iter().map(|i| texts[*i].clone()).collect();
            let fresh = self.inner.embed_batch(model, &to_embed).await?;

            for (i, result) in missing.into_iter().zip(fresh) {
                self.cache
                    .insert(Self::key(model, &texts[i]), result.clone())
                    .await;
                results[i] = Some(result);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::error::{ErrorKind, VectorError};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_second_embed_is_served_from_cache() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed()
            .with(eq(EmbeddingModel::TextEmbedding3Small), eq("ripgrep"))
            .times(1)
            .returning(|_, _| Ok(EmbeddingResult::new(vec![0.1, 0.2])));

        let cached = CachedEmbeddingProvider::new(Arc::new(mock), 100);

        let first = cached
            .embed(EmbeddingModel::TextEmbedding3Small, "ripgrep")
            .await
            .unwrap();
        let second = cached
            .embed(EmbeddingModel::TextEmbedding3Small, "ripgrep")
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_different_models_do_not_share_entries() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed()
            .times(2)
            .returning(|model, _| Ok(EmbeddingResult::new(vec![0.0; model.dimension() as usize])));

        let cached = CachedEmbeddingProvider::new(Arc::new(mock), 100);
        cached
            .embed(EmbeddingModel::Custom(4), "fd")
            .await
            .unwrap();
        let other = cached
            .embed(EmbeddingModel::Custom(8), "fd")
            .await
            .unwrap();

        assert_eq!(other.dimension, 8);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let mut mock = MockEmbeddingProvider::new();
        let mut calls = 0;
        mock.expect_embed().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(VectorError::embedding(ErrorKind::RateLimited, "slow down"))
            } else {
                Ok(EmbeddingResult::new(vec![1.0]))
            }
        });

        let cached = CachedEmbeddingProvider::new(Arc::new(mock), 100);
        let first = cached.embed(EmbeddingModel::default(), "jq").await;
        assert!(first.is_err());
        assert!(cached.embed(EmbeddingModel::default(), "jq").await.is_ok());
    }

    #[tokio::test]
    async fn test_batch_only_embeds_misses() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed()
            .times(1)
            .returning(|_, _| Ok(EmbeddingResult::new(vec![1.0])));
        mock.expect_embed_batch()
            .withf(|_, texts: &[String]| texts == ["b".to_string()])
            .times(1)
            .returning(|_, _| Ok(vec![EmbeddingResult::new(vec![2.0])]));

        let cached = CachedEmbeddingProvider::new(Arc::new(mock), 100);
        cached.embed(EmbeddingModel::default(), "a").await.unwrap();

        let results = cached
            .embed_batch(EmbeddingModel::default(), &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].values, vec![1.0]);
        assert_eq!(results[1].values, vec![2.0]);
    }
}
