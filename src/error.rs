//! Error types
//!
//! Pure conversion passes degrade to warnings instead of failing. Only the
//! crate boundary and the external document-store capability produce errors.

/// Failure reported by a [`DocumentStore`](crate::orchestration::DocumentStore)
/// implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Transport-level failure (timeout, connection reset, ...)
    #[error("Document store request failed: {0}")]
    Request(String),

    /// Target block or document does not exist
    #[error("Block not found: {0}")]
    NotFound(String),

    /// Store is throttling requests
    #[error("Rate limited by document store")]
    RateLimited,

    /// Store refused the payload (validation, size, nesting)
    #[error("Document store rejected request: {0}")]
    Rejected(String),

    /// Binary upload failed
    #[error("Upload failed for {source_url}: {reason}")]
    Upload { source_url: String, reason: String },
}

/// A chunked append that stopped part way. The first `appended` blocks
/// were written.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{source} ({appended} block(s) already appended)")]
pub struct PartialAppend {
    pub appended: usize,
    pub source: StoreError,
}

/// Errors surfaced at the public API boundary.
#[derive(Debug, thiserror::Error)]
pub enum Sn2nError {
    /// Input exceeds the hard size cap
    #[error("HTML input too large: {size} bytes (maximum {max} bytes)")]
    InputTooLarge { size: usize, max: usize },

    /// External capability failed in a way that aborts the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration or payload could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Sn2nError> = std::result::Result<T, E>;
