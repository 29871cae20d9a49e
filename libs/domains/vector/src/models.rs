use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Distance metric for similarity calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
    Manhattan,
}

/// HNSW index configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswConfig {
    pub m: Option<u32>,
    pub ef_construct: Option<u32>,
    pub full_scan_threshold: Option<u32>,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: Some(16),
            ef_construct: Some(100),
            full_scan_threshold: None,
        }
    }
}

/// Vector collection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    pub dimension: u32,
    pub distance: DistanceMetric,
    pub hnsw: Option<HnswConfig>,
}

impl VectorConfig {
    pub fn new(dimension: u32) -> Self {
        Self {
            dimension,
            distance: DistanceMetric::default(),
            hnsw: None,
        }
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_hnsw(mut self, hnsw: HnswConfig) -> Self {
        self.hnsw = Some(hnsw);
        self
    }
}

/// A vector point with payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub id: Uuid,
    pub values: Vec<f32>,
    pub payload: Option<serde_json::Value>,
}

impl Vector {
    pub fn new(id: Uuid, values: Vec<f32>) -> Self {
        Self {
            id,
            values,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Embedding provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingProviderType {
    #[default]
    OpenAI,
    Local,
}

/// Embedding model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// OpenAI text-embedding-3-small (1536 dimensions)
    #[default]
    TextEmbedding3Small,
    /// OpenAI text-embedding-3-large (3072 dimensions)
    TextEmbedding3Large,
    /// OpenAI text-embedding-ada-002 (1536 dimensions, legacy)
    TextEmbeddingAda002,

    /// Custom model with specified dimension
    Custom(u32),
}

impl EmbeddingModel {
    pub fn dimension(&self) -> u32 {
        match self {
            EmbeddingModel::TextEmbedding3Small => 1536,
            EmbeddingModel::TextEmbedding3Large => 3072,
            EmbeddingModel::TextEmbeddingAda002 => 1536,
            EmbeddingModel::Custom(dim) => *dim,
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingModel::TextEmbedding3Small => "text-embedding-3-small",
            EmbeddingModel::TextEmbedding3Large => "text-embedding-3-large",
            EmbeddingModel::TextEmbeddingAda002 => "text-embedding-ada-002",
            EmbeddingModel::Custom(_) => "custom",
        }
    }

    /// Parse an OpenAI model name (`EMBEDDING_MODEL`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "text-embedding-3-small" => Some(EmbeddingModel::TextEmbedding3Small),
            "text-embedding-3-large" => Some(EmbeddingModel::TextEmbedding3Large),
            "text-embedding-ada-002" => Some(EmbeddingModel::TextEmbeddingAda002),
            _ => None,
        }
    }

    /// Get the provider type this model belongs to
    pub fn provider(&self) -> EmbeddingProviderType {
        match self {
            EmbeddingModel::Custom(_) => EmbeddingProviderType::Local,
            _ => EmbeddingProviderType::OpenAI,
        }
    }
}

/// Embedding result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    pub values: Vec<f32>,
    pub dimension: u32,
    pub tokens_used: u32,
}

impl EmbeddingResult {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            dimension: values.len() as u32,
            values,
            tokens_used: 0,
        }
    }
}
