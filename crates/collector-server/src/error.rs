//! Collector error types
//!
//! Typed errors for the archive pipeline. Per-archive failures never cross
//! the coordinator boundary as errors; the pipeline reduces them to an
//! `ArchiveOutcome::Failure` carrying the rendered message. Orchestration
//! code (startup, schedulers) uses `anyhow` on top of these.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Errors raised by the archive ingestion pipeline and its collaborators
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Manifest or archive fetch failed (non-2xx, socket fault, timeout)
    #[error("transport error for '{url}': {reason}")]
    Transport { url: String, reason: String },

    /// Downloaded archive digest does not match the manifest hash
    #[error("hash mismatch: {computed} != {expected}")]
    HashMismatch { computed: String, expected: String },

    /// Archive entry resolves outside the extraction root (Zip Slip)
    #[error("zip entry escapes the extraction root: {entry}")]
    ZipTraversal { entry: String },

    /// Archive could not be read or unpacked
    #[error("failed to extract archive: {0}")]
    Extraction(String),

    /// Object store upload or delete failed
    #[error("object storage error: {0}")]
    Storage(String),

    /// Archive name matches no known archive type
    #[error("unknown archive type: {0}")]
    UnknownArchiveType(String),

    /// Key-value store access failed
    #[error("key-value store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Send-status record could not be serialized or deserialized
    #[error("failed to encode send-status record: {0}")]
    Record(#[from] serde_json::Error),

    #[error("file operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectorError {
    /// Create a transport error with the failing URL attached.
    pub fn transport(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an object storage error.
    pub fn storage(reason: impl std::fmt::Display) -> Self {
        Self::Storage(reason.to_string())
    }
}
