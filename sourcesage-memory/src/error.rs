//! Error types for sourcesage-memory

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the memory system
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Entity not found
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Relation endpoint does not exist
    #[error("Cannot relate {from_id} -> {to_id}: entity {missing} does not exist")]
    MissingEndpoint {
        from_id: String,
        to_id: String,
        missing: String,
    },

    /// No snapshot at the given path (first load)
    #[error("Snapshot not found: {}", .0.display())]
    SnapshotNotFound(PathBuf),

    /// Snapshot exists but could not be decoded
    #[error("Malformed snapshot at {}: {source}", path.display())]
    MalformedSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// IO error
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MemoryError {
    /// Create an entity not found error
    pub fn entity_not_found(id: impl Into<String>) -> Self {
        Self::EntityNotFound(id.into())
    }

    /// Create a missing endpoint error
    pub fn missing_endpoint(
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        missing: impl Into<String>,
    ) -> Self {
        Self::MissingEndpoint {
            from_id: from_id.into(),
            to_id: to_id.into(),
            missing: missing.into(),
        }
    }

    /// Create an IO error tied to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when a load failed only because nothing was saved yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SnapshotNotFound(_))
    }

    /// True when the snapshot exists but is corrupt
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedSnapshot { .. })
    }
}

/// Result type for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;
