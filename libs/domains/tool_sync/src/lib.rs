//! Tool Sync Domain
//!
//! Keeps the vector search collections eventually consistent with the tool
//! catalog stored in MongoDB.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  SweepScheduler  │  ← Timer loop, backoff, admin overrides
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │   SyncService    │  ← Per-collection sync, retries, tracking updates
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐     ┌──────────────────────────────────┐
//! │ Change detector  │     │ ToolRepository / VectorRepository │
//! │ Content / payload│     │ EmbeddingProvider (injected)      │
//! └──────────────────┘     └──────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use core_config::FromEnv;
//! use domain_tool_sync::{SweepConfig, SweepScheduler, SyncService, SyncServiceConfig};
//! use domain_tools::MongoToolRepository;
//! use domain_vector::{OpenAIProvider, QdrantConfig, QdrantRepository};
//!
//! # async fn example(tools: MongoToolRepository) -> Result<(), Box<dyn std::error::Error>> {
//! let service = SyncService::new(
//!     Arc::new(tools),
//!     Arc::new(QdrantRepository::new(QdrantConfig::from_env()?).await?),
//!     Arc::new(OpenAIProvider::from_env()?),
//!     SyncServiceConfig::from_env()?,
//! );
//!
//! let scheduler = Arc::new(SweepScheduler::new(Arc::new(service), SweepConfig::from_env()?));
//! let result = scheduler.trigger_sweep().await;
//! println!("processed {} tools", result.processed);
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod detector;
pub mod error;
mod fields;
pub mod metrics;
pub mod models;
pub mod payload;
pub mod scheduler;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use content::{ContentGenerator, ContentGeneratorRegistry, TemplateContentGenerator};
pub use detector::{ChangeClassification, classify_change, classify_fields, fingerprint, needs_sync};
pub use error::SyncError;
pub use models::{
    ActionResult, BatchActionResult, CollectionDeleteResult, CollectionSyncResult, DeleteResult,
    SweepError, SweepResult, SyncOptions, SyncOutcome, SyncResult, WorkerStatus,
};
pub use scheduler::{MAX_BATCH_IDS, SweepConfig, SweepScheduler};
pub use service::{SyncService, SyncServiceConfig};
