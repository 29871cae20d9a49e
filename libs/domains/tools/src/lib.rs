//! Tools Domain
//!
//! The catalog record ("tool"), its per-collection sync tracking block and
//! the primary-store contract used by the sync subsystem.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  ToolRepository  │  ← Data access (trait + MongoDB / in-memory)
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │ Models + Sync    │  ← Tool, SyncMetadata, CollectionSyncState,
//! │ state            │    field-level patches
//! └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_tools::{MongoToolRepository, ToolRepository};
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let repository = MongoToolRepository::new(client.database("catalog"));
//! let tool = repository.get_by_slug("ripgrep").await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod sync_state;

// Re-export commonly used types
pub use error::{ToolError, ToolResult};
pub use memory::InMemoryToolRepository;
pub use models::{SyncStats, Tool, ToolField, ToolStatus};
pub use mongodb::MongoToolRepository;
pub use repository::{SyncQuery, ToolRepository};
pub use sync_state::{
    CollectionName, CollectionPatch, CollectionSyncState, RetryCountOp, SyncErrorCode,
    SyncMetadata, SyncMetadataPatch, SyncStatus,
};
