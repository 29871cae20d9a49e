use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::EmbeddingProvider;
use crate::error::{ErrorKind, VectorError, VectorResult};
use crate::models::{EmbeddingModel, EmbeddingProviderType, EmbeddingResult};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI embedding provider configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl FromEnv for OpenAIConfig {
    /// OPENAI_API_KEY (required), OPENAI_BASE_URL, OPENAI_TIMEOUT_SECS
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env_required("OPENAI_API_KEY")?,
            base_url: env_or_default("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            timeout_secs: env_parse("OPENAI_TIMEOUT_SECS", 30)?,
        })
    }
}

/// OpenAI embeddings provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> VectorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> VectorResult<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    usage: EmbeddingUsage,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct EmbeddingUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

impl EmbeddingResponse {
    fn into_results(self, expected: usize) -> VectorResult<Vec<EmbeddingResult>> {
        if self.data.len() != expected {
            return Err(VectorError::embedding(
                ErrorKind::Other,
                format!(
                    "Expected {} embeddings, provider returned {}",
                    expected,
                    self.data.len()
                ),
            ));
        }

        // Sort by index to maintain order
        let mut data = self.data;
        data.sort_by_key(|d| d.index);

        let tokens_per_embedding = self.usage.total_tokens / expected.max(1) as u32;

        Ok(data
            .into_iter()
            .map(|d| EmbeddingResult {
                dimension: d.embedding.len() as u32,
                values: d.embedding,
                tokens_used: tokens_per_embedding,
            })
            .collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::OpenAI
    }

    async fn embed(&self, model: EmbeddingModel, text: &str) -> VectorResult<EmbeddingResult> {
        let results = self.embed_batch(model, &[text.to_string()]).await?;
        results.into_iter().next().ok_or_else(|| {
            VectorError::embedding(ErrorKind::Other, "No embedding returned")
        })
    }

    #[instrument(skip(self, texts), fields(model = model.model_name(), count = texts.len()))]
    async fn embed_batch(
        &self,
        model: EmbeddingModel,
        texts: &[String],
    ) -> VectorResult<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let dimensions = match model {
            EmbeddingModel::Custom(dim) => Some(dim),
            _ => None,
        };

        let request = EmbeddingRequest {
            model: model.model_name().to_string(),
            input: texts.to_vec(),
            dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let kind = ErrorKind::from_http_status(status.as_u16());
            tracing::warn!(status = %status, kind = %kind, "Embedding request rejected");
            return Err(VectorError::embedding(
                kind,
                format!("OpenAI API error ({}): {}", status, error_text),
            ));
        }

        let embedding_response: EmbeddingResponse = response.json().await?;
        embedding_response.into_results(texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names() {
        assert_eq!(
            EmbeddingModel::TextEmbedding3Small.model_name(),
            "text-embedding-3-small"
        );
        assert_eq!(
            EmbeddingModel::TextEmbedding3Large.model_name(),
            "text-embedding-3-large"
        );
        assert_eq!(
            EmbeddingModel::TextEmbeddingAda002.model_name(),
            "text-embedding-ada-002"
        );
    }

    #[test]
    fn test_model_dimensions() {
        assert_eq!(EmbeddingModel::TextEmbedding3Small.dimension(), 1536);
        assert_eq!(EmbeddingModel::TextEmbedding3Large.dimension(), 3072);
        assert_eq!(EmbeddingModel::Custom(768).dimension(), 768);
    }

    #[test]
    fn test_response_is_reordered_by_index() {
        let response: EmbeddingResponse = serde_json::from_value(serde_json::json!({
            "data": [
                { "embedding": [2.0, 2.0], "index": 1 },
                { "embedding": [1.0, 1.0], "index": 0 }
            ],
            "usage": { "prompt_tokens": 8, "total_tokens": 8 }
        }))
        .unwrap();

        let results = response.into_results(2).unwrap();
        assert_eq!(results[0].values, vec![1.0, 1.0]);
        assert_eq!(results[1].values, vec![2.0, 2.0]);
        assert_eq!(results[0].tokens_used, 4);
    }

    #[test]
    fn test_short_response_is_an_error() {
        let response: EmbeddingResponse = serde_json::from_value(serde_json::json!({
            "data": [],
            "usage": { "prompt_tokens": 0, "total_tokens": 0 }
        }))
        .unwrap();

        let err = response.into_results(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_config_requires_api_key() {
        temp_env::with_vars(
            [("OPENAI_API_KEY", None::<&str>), ("OPENAI_BASE_URL", None)],
            || {
                assert!(OpenAIConfig::from_env().is_err());
            },
        );

        temp_env::with_vars(
            [
                ("OPENAI_API_KEY", Some("sk-test")),
                ("OPENAI_BASE_URL", Some("http://localhost:8080/v1")),
            ],
            || {
                let config = OpenAIConfig::from_env().unwrap();
                assert_eq!(config.api_key, "sk-test");
                assert_eq!(config.base_url, "http://localhost:8080/v1");
                assert_eq!(config.timeout_secs, 30);
            },
        );
    }
}
