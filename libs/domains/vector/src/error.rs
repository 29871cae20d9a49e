use strum::Display;
use thiserror::Error;

/// Machine-readable failure class of a collaborator call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    RateLimited,
    Connection,
    Validation,
    NotFound,
    Other,
}

impl ErrorKind {
    /// Transient failures worth another attempt; unknown server-side
    /// failures count as transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::Validation | ErrorKind::NotFound)
    }

    /// Classify a gRPC status code
    pub fn from_grpc_code(code: i32) -> Self {
        match code {
            // CANCELLED, DEADLINE_EXCEEDED
            1 | 4 => ErrorKind::Timeout,
            // INVALID_ARGUMENT, FAILED_PRECONDITION, OUT_OF_RANGE, UNAUTHENTICATED, PERMISSION_DENIED
            3 | 9 | 11 | 16 | 7 => ErrorKind::Validation,
            5 => ErrorKind::NotFound,
            8 => ErrorKind::RateLimited,
            // UNAVAILABLE
            14 => ErrorKind::Connection,
            _ => ErrorKind::Other,
        }
    }

    /// Classify an HTTP status code
    pub fn from_http_status(status: u16) -> Self {
        match status {
            408 | 504 => ErrorKind::Timeout,
            429 => ErrorKind::RateLimited,
            404 => ErrorKind::NotFound,
            400 | 401 | 403 | 413 | 422 => ErrorKind::Validation,
            502 | 503 => ErrorKind::Connection,
            _ => ErrorKind::Other,
        }
    }

    /// Classify a transport-level HTTP client error
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connection
        } else if let Some(status) = err.status() {
            Self::from_http_status(status.as_u16())
        } else {
            ErrorKind::Other
        }
    }
}

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Qdrant error ({kind}): {message}")]
    Qdrant { kind: ErrorKind, message: String },

    #[error("Embedding error ({kind}): {message}")]
    Embedding { kind: ErrorKind, message: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

impl VectorError {
    pub fn qdrant(kind: ErrorKind, message: impl Into<String>) -> Self {
        VectorError::Qdrant {
            kind,
            message: message.into(),
        }
    }

    pub fn embedding(kind: ErrorKind, message: impl Into<String>) -> Self {
        VectorError::Embedding {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VectorError::Qdrant { kind, .. } | VectorError::Embedding { kind, .. } => *kind,
            VectorError::Validation(_) | VectorError::Config(_) => ErrorKind::Validation,
            VectorError::Internal(_) => ErrorKind::Other,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<qdrant_client::QdrantError> for VectorError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        use qdrant_client::QdrantError;

        let kind = match &err {
            QdrantError::ResponseError { status } => ErrorKind::from_grpc_code(status.code() as i32),
            QdrantError::ResourceExhaustedError { .. } => ErrorKind::RateLimited,
            _ => ErrorKind::Other,
        };
        VectorError::qdrant(kind, err.to_string())
    }
}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        VectorError::embedding(ErrorKind::from_reqwest(&err), err.to_string())
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Internal(format!("JSON error: {}", err))
    }
}

impl From<core_config::ConfigError> for VectorError {
    fn from(err: core_config::ConfigError) -> Self {
        VectorError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::Connection.is_retryable());
        assert!(ErrorKind::Other.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
    }

    #[test]
    fn test_grpc_classification() {
        assert_eq!(ErrorKind::from_grpc_code(4), ErrorKind::Timeout);
        assert_eq!(ErrorKind::from_grpc_code(8), ErrorKind::RateLimited);
        assert_eq!(ErrorKind::from_grpc_code(14), ErrorKind::Connection);
        assert_eq!(ErrorKind::from_grpc_code(3), ErrorKind::Validation);
        assert_eq!(ErrorKind::from_grpc_code(5), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_grpc_code(13), ErrorKind::Other);
    }

    #[test]
    fn test_http_classification() {
        assert_eq!(ErrorKind::from_http_status(429), ErrorKind::RateLimited);
        assert_eq!(ErrorKind::from_http_status(504), ErrorKind::Timeout);
        assert_eq!(ErrorKind::from_http_status(503), ErrorKind::Connection);
        assert_eq!(ErrorKind::from_http_status(401), ErrorKind::Validation);
        assert_eq!(ErrorKind::from_http_status(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_http_status(500), ErrorKind::Other);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate_limited");
        let err = VectorError::embedding(ErrorKind::Timeout, "took too long");
        assert_eq!(err.to_string(), "Embedding error (timeout): took too long");
    }

    #[test]
    fn test_vector_error_kind() {
        assert!(VectorError::qdrant(ErrorKind::NotFound, "gone").is_not_found());
        assert!(!VectorError::Validation("bad".into()).is_retryable());
        assert!(VectorError::Internal("oops".into()).is_retryable());
    }
}
