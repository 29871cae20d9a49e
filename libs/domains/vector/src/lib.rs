//! Vector Domain Library
//!
//! Vector-store and embedding collaborators for the tool sync subsystem,
//! wrapping Qdrant and the OpenAI embeddings API behind traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────────┐
//! │ VectorRepository│     │  EmbeddingProvider   │
//! │   (trait)       │     │    (trait)           │
//! └────────┬────────┘     └──────────┬───────────┘
//!          │                         │
//! ┌────────▼────────┐     ┌──────────▼───────────┐
//! │ QdrantRepository│     │ CachedEmbeddingProvider│
//! │ (implementation)│     │   └─ OpenAIProvider   │
//! └─────────────────┘     └──────────────────────┘
//! ```
//!
//! Every error carries an [`ErrorKind`] classified where it happens
//! (gRPC code, HTTP status, transport flags), so callers decide on retries
//! without inspecting messages.
//!
//! # Usage
//!
//! ```rust,no_run
//! use core_config::FromEnv;
//! use domain_vector::{
//!     EmbeddingModel, EmbeddingProvider, OpenAIProvider, QdrantConfig, QdrantRepository,
//!     Vector, VectorConfig, VectorRepository,
//! };
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = QdrantRepository::new(QdrantConfig::from_env()?).await?;
//! repository.ensure_collection("tools", VectorConfig::new(1536)).await?;
//!
//! let provider = OpenAIProvider::from_env()?;
//! let embedding = provider
//!     .embed(EmbeddingModel::TextEmbedding3Small, "fast grep replacement")
//!     .await?;
//!
//! let vector = Vector::new(Uuid::new_v4(), embedding.values);
//! repository.upsert("tools", vector).await?;
//! # Ok(())
//! # }
//! ```

pub mod embedding;
pub mod error;
pub mod models;
pub mod qdrant;
pub mod repository;

// Re-export commonly used types
pub use embedding::{CachedEmbeddingProvider, EmbeddingProvider, OpenAIConfig, OpenAIProvider};
pub use error::{ErrorKind, VectorError, VectorResult};
pub use models::{
    DistanceMetric, EmbeddingModel, EmbeddingProviderType, EmbeddingResult, HnswConfig, Vector,
    VectorConfig,
};
pub use qdrant::{QdrantConfig, QdrantRepository};
pub use repository::VectorRepository;
