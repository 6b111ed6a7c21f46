//! Error types for minidfs

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Placement Errors ===
    #[error("No storage nodes available")]
    NoNodesAvailable,

    // === Namespace Errors ===
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File {file} has {} chunk(s) with no known location: {}", .chunks.len(), .chunks.join(", "))]
    ChunkLocationMissing { file: String, chunks: Vec<String> },

    #[error("Failed to persist namespace: {0}")]
    PersistenceFailure(String),

    // === Storage Errors ===
    #[error("Chunk not found: {0}")]
    ChunkNotFound(String),

    #[error("Corrupted data: {0}")]
    Corrupted(String),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Invalid chunk id: {0}")]
    InvalidChunkId(String),

    // === Network Errors ===
    #[error("Node {node} unreachable: {reason}")]
    NodeUnreachable { node: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

/// Wire-level error classification.
///
/// Remote calls carry `{kind, message}` so the caller can rebuild an
/// [`Error`] of the same kind on its side of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoNodesAvailable,
    FileNotFound,
    ChunkLocationMissing,
    NodeUnreachable,
    PersistenceFailure,
    ChunkNotFound,
    Corrupted,
    InvalidChunkId,
    InvalidConfig,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::NodeUnreachable | ErrorKind::NoNodesAvailable
        )
    }
}

/// JSON error body returned by the coordinator and node HTTP APIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    /// Chunk ids for `chunk_location_missing`, node id for `node_unreachable`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detail: Vec<String>,
}

impl Error {
    /// Is this a retryable error?
    ///
    /// Decided by [`ErrorKind`] alone, so an error keeps its classification
    /// after a trip over the wire. Nothing in the transfer path retries
    /// automatically; the flag only lets callers tell transient failures
    /// from permanent ones.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoNodesAvailable => ErrorKind::NoNodesAvailable,
            Error::FileNotFound(_) => ErrorKind::FileNotFound,
            Error::ChunkLocationMissing { .. } => ErrorKind::ChunkLocationMissing,
            Error::NodeUnreachable { .. } | Error::Http(_) => ErrorKind::NodeUnreachable,
            Error::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
            Error::ChunkNotFound(_) => ErrorKind::ChunkNotFound,
            Error::Corrupted(_) | Error::ChecksumMismatch { .. } => ErrorKind::Corrupted,
            Error::InvalidChunkId(_) => ErrorKind::InvalidChunkId,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Io(_) | Error::Internal(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self.kind() {
            ErrorKind::FileNotFound | ErrorKind::ChunkNotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidChunkId | ErrorKind::InvalidConfig => StatusCode::BAD_REQUEST,
            ErrorKind::NoNodesAvailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::NodeUnreachable => StatusCode::BAD_GATEWAY,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::ChunkLocationMissing => StatusCode::CONFLICT,
            ErrorKind::Corrupted => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::PersistenceFailure | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let detail = match self {
            Error::ChunkLocationMissing { file, chunks } => {
                let mut detail = vec![file.clone()];
                detail.extend(chunks.iter().cloned());
                detail
            }
            Error::NodeUnreachable { node, .. } => vec![node.clone()],
            _ => Vec::new(),
        };
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
            detail,
        }
    }

    /// Rebuild an error from its wire form
    pub fn from_body(body: ErrorBody) -> Self {
        let ErrorBody {
            kind,
            message,
            mut detail,
        } = body;
        match kind {
            ErrorKind::NoNodesAvailable => Error::NoNodesAvailable,
            ErrorKind::FileNotFound => Error::FileNotFound(
                message
                    .strip_prefix("File not found: ")
                    .unwrap_or(&message)
                    .to_string(),
            ),
            ErrorKind::ChunkLocationMissing if !detail.is_empty() => {
                let file = detail.remove(0);
                Error::ChunkLocationMissing {
                    file,
                    chunks: detail,
                }
            }
            ErrorKind::NodeUnreachable if !detail.is_empty() => Error::NodeUnreachable {
                node: detail.remove(0),
                reason: message,
            },
            ErrorKind::NodeUnreachable => Error::Http(message),
            ErrorKind::PersistenceFailure => Error::PersistenceFailure(message),
            ErrorKind::ChunkNotFound => Error::ChunkNotFound(
                message
                    .strip_prefix("Chunk not found: ")
                    .unwrap_or(&message)
                    .to_string(),
            ),
            ErrorKind::Corrupted => Error::Corrupted(message),
            ErrorKind::InvalidChunkId => Error::InvalidChunkId(message),
            ErrorKind::InvalidConfig => Error::InvalidConfig(message),
            ErrorKind::Timeout => Error::Timeout(message),
            ErrorKind::ChunkLocationMissing | ErrorKind::Internal => Error::Internal(message),
        }
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.to_http_status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, axum::Json(self.to_body())).into_response()
    }
}

// Implement From for common error types
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Timeout("put".into()).is_retryable());
        assert!(Error::NodeUnreachable {
            node: "node-1".into(),
            reason: "refused".into()
        }
        .is_retryable());
        assert!(!Error::FileNotFound("a.txt".into()).is_retryable());
        assert!(!Error::PersistenceFailure("disk full".into()).is_retryable());
    }

    #[test]
    fn test_coordinator_transport_failure_is_retryable() {
        let err = Error::Http("connection refused".into());
        assert_eq!(err.kind(), ErrorKind::NodeUnreachable);
        assert!(err.is_retryable());

        // Same answer after the wire round trip
        let back = Error::from_body(err.to_body());
        assert!(matches!(back, Error::Http(_)));
        assert!(back.is_retryable());
    }

    #[test]
    fn test_retryable_agrees_within_kind() {
        let samples = [
            Error::Io(std::io::Error::other("x")),
            Error::Other("x".into()),
            Error::Internal("x".into()),
            Error::Corrupted("x".into()),
            Error::ChecksumMismatch {
                expected: "a".into(),
                actual: "b".into(),
            },
            Error::Http("x".into()),
            Error::NodeUnreachable {
                node: "n".into(),
                reason: "x".into(),
            },
        ];
        for err in &samples {
            assert_eq!(err.is_retryable(), err.kind().is_retryable(), "{err}");
        }
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            Error::FileNotFound("x".into()).to_http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::NoNodesAvailable.to_http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::PersistenceFailure("x".into()).to_http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_wire_form_keeps_kind_and_payload() {
        let err = Error::ChunkLocationMissing {
            file: "movie.mp4".into(),
            chunks: vec!["movie.mp4_chunk_3".into()],
        };
        match Error::from_body(err.to_body()) {
            Error::ChunkLocationMissing { file, chunks } => {
                assert_eq!(file, "movie.mp4");
                assert_eq!(chunks, vec!["movie.mp4_chunk_3".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match Error::from_body(Error::FileNotFound("notes.txt".into()).to_body()) {
            Error::FileNotFound(name) => assert_eq!(name, "notes.txt"),
            other => panic!("unexpected error: {other:?}"),
        }

        let body = serde_json::to_value(Error::NoNodesAvailable.to_body()).unwrap();
        assert_eq!(body["kind"], "no_nodes_available");
    }
}
