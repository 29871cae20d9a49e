//! Database library providing the MongoDB connector and the shared retry policy
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB support
//! - `config` - Configuration support with `core_config::FromEnv`
//! - `all` - All features
//!
//! # Examples
//!
//! ## MongoDB
//!
//! ```ignore
//! use database::mongodb;
//!
//! let client = mongodb::connect("mongodb://localhost:27017").await?;
//! let db = client.database("catalog");
//! let collection = db.collection::<Document>("tools");
//! ```
//!
//! ## Retry policy
//!
//! ```ignore
//! use database::common::RetryPolicy;
//!
//! let policy = RetryPolicy::linear(3, Duration::from_secs(1));
//! let (result, attempts) = policy.run(|_| embed(text), |e| e.is_retryable()).await;
//! ```

// Always available modules
pub mod common;

#[cfg(feature = "mongodb")]
pub mod mongodb;

// Re-exports for convenience
pub use common::{Backoff, DatabaseError, DatabaseResult, RetryPolicy};
