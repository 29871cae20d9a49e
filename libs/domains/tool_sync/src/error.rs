use domain_tools::{CollectionName, SyncErrorCode, ToolError};
use domain_vector::VectorError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Content generation failed for {collection}: {message}")]
    ContentGeneration {
        collection: CollectionName,
        message: String,
    },

    #[error("Embedding failed: {0}")]
    Embedding(VectorError),

    #[error("Vector upsert failed: {0}")]
    VectorUpsert(VectorError),

    #[error("Vector delete failed: {0}")]
    VectorDelete(VectorError),

    #[error("Tool not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Invalid tool data: {0}")]
    InvalidRecord(String),

    #[error("Failed to persist sync metadata: {0}")]
    MetadataPersist(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl SyncError {
    /// Code stored in `error_code` and returned to the admin surface
    pub fn code(&self) -> SyncErrorCode {
        match self {
            SyncError::ContentGeneration { .. } => SyncErrorCode::ContentGenerationFailed,
            SyncError::Embedding(_) => SyncErrorCode::EmbeddingFailed,
            SyncError::VectorUpsert(_) => SyncErrorCode::VectorUpsertFailed,
            SyncError::VectorDelete(_) => SyncErrorCode::VectorDeleteFailed,
            SyncError::RecordNotFound(_) => SyncErrorCode::RecordNotFound,
            SyncError::InvalidRecord(_) => SyncErrorCode::InvalidRecordData,
            SyncError::MetadataPersist(_) => SyncErrorCode::MetadataPersistFailed,
            SyncError::Validation(_) => SyncErrorCode::ValidationFailed,
        }
    }

    /// Whether another attempt within the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Embedding(e) | SyncError::VectorUpsert(e) | SyncError::VectorDelete(e) => {
                e.is_retryable()
            }
            SyncError::MetadataPersist(_) => true,
            SyncError::ContentGeneration { .. }
            | SyncError::RecordNotFound(_)
            | SyncError::InvalidRecord(_)
            | SyncError::Validation(_) => false,
        }
    }
}

impl From<ToolError> for SyncError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(id) => SyncError::RecordNotFound(id),
            ToolError::Validation(msg) => SyncError::Validation(msg),
            // Every other store failure happens while reading or writing tracking data
            ToolError::Database(msg) | ToolError::Internal(msg) => SyncError::MetadataPersist(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_vector::ErrorKind;

    #[test]
    fn test_codes() {
        let err = SyncError::Embedding(VectorError::embedding(ErrorKind::Timeout, "slow"));
        assert_eq!(err.code(), SyncErrorCode::EmbeddingFailed);
        assert_eq!(err.code().to_string(), "EMBEDDING_FAILED");

        let err = SyncError::ContentGeneration {
            collection: CollectionName::Tools,
            message: "empty".into(),
        };
        assert_eq!(err.code(), SyncErrorCode::ContentGenerationFailed);
    }

    #[test]
    fn test_retryable_follows_collaborator_kind() {
        let transient = SyncError::VectorUpsert(VectorError::qdrant(ErrorKind::Connection, "reset"));
        let permanent = SyncError::VectorUpsert(VectorError::qdrant(ErrorKind::Validation, "dim"));
        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());

        let content = SyncError::ContentGeneration {
            collection: CollectionName::Usecases,
            message: "blank".into(),
        };
        assert!(!content.is_retryable());
    }

    #[test]
    fn test_from_tool_error() {
        let id = Uuid::now_v7();
        assert!(matches!(
            SyncError::from(ToolError::NotFound(id)),
            SyncError::RecordNotFound(x) if x == id
        ));
        assert_eq!(
            SyncError::from(ToolError::Database("down".into())).code(),
            SyncErrorCode::MetadataPersistFailed
        );
    }
}
