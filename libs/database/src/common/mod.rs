//! Common utilities shared across database consumers

pub mod error;
pub mod retry;

pub use error::{DatabaseError, DatabaseResult};
pub use retry::{Backoff, RetryPolicy, retry, retry_with_backoff};
