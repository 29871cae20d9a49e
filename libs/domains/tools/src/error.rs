use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

impl From<mongodb::error::Error> for ToolError {
    fn from(err: mongodb::error::Error) -> Self {
        ToolError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for ToolError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        ToolError::Internal(format!("BSON serialization failed: {}", err))
    }
}
