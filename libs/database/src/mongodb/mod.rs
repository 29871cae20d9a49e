//! MongoDB database connector
//!
//! Provides connection management with retry on startup.

mod config;
mod connector;

pub use config::MongoConfig;
pub use connector::{
    MongoError, connect, connect_from_config, connect_from_config_with_retry, connect_with_retry,
};

// Re-export MongoDB types for convenience
pub use mongodb::{Client, Collection, Database};
