//! Error types for batchscreen.
//!
//! One crate-wide error enum built on `thiserror`. Row-level errors
//! (validation, transport, timeout) are caught by the dispatcher and turned
//! into per-row failure statuses; only batch-level problems propagate out.

use std::time::Duration;

use thiserror::Error;

/// The primary error type for screening operations.
#[derive(Error, Debug)]
pub enum ScreenError {
    /// A row produced an empty subject name; rejected before any network call.
    #[error("empty subject name for row {row}")]
    EmptySubject {
        /// Zero-based input row index.
        row: usize,
    },

    /// The search service did not answer within the per-call budget.
    #[error("search for '{subject}' timed out after {timeout:?}")]
    Timeout { subject: String, timeout: Duration },

    /// The search service answered with a non-2xx status.
    #[error("search for '{subject}' failed: {status}")]
    Api {
        subject: String,
        status: reqwest::StatusCode,
    },

    /// Connection-level failure while searching one subject.
    #[error("search for '{subject}' failed: {source}")]
    Transport {
        subject: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP failures outside of a per-row search (ping, client setup).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Batch completed but produced a different number of rows than it was given.
    #[error("output has {got} rows, expected {want}")]
    RowCountMismatch { got: usize, want: usize },

    /// Every row in the batch failed.
    #[error("all {0} rows failed")]
    AllRowsFailed(usize),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization errors from the service wire format
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for screening operations.
pub type Result<T> = std::result::Result<T, ScreenError>;
