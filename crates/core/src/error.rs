//! Error types for Trislot
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for Trislot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the snapshot and document stores
#[derive(Debug, Error)]
pub enum Error {
    /// An open/read/write/truncate/fsync call failed
    ///
    /// Fatal for the store that hit it: no further I/O is attempted.
    #[error("I/O failure during {op} on {}: {source}", path.display())]
    IoFailure {
        /// Step of the slot protocol that failed
        op: &'static str,
        /// File the step was operating on
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The store failed earlier and accepts no more work
    #[error("Snapshot store failed: {reason}")]
    Failed {
        /// Description of the original failure
        reason: String,
    },

    /// The snapshot store is shutting down or shut down
    #[error("Snapshot store is closed")]
    Closed,

    /// The document store was already ended
    #[error("Document store already ended")]
    AlreadyEnded,

    /// The version counter no longer fits in the 4-byte header
    #[error("Version {version} does not fit in a slot header")]
    VersionOverflow {
        /// Version that overflowed
        version: i64,
    },

    /// A recovered document frame is malformed
    #[error("Corrupt document frame: {0}")]
    CorruptFrame(String),

    /// Compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Document serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Rejected configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A background thread panicked
    #[error("Background thread panicked: {0}")]
    WorkerPanicked(&'static str),
}

impl Error {
    /// Build a `map_err` adapter tagging an I/O error with its step and path.
    ///
    /// ```
    /// use std::path::Path;
    /// use trislot_core::Error;
    ///
    /// let path = Path::new("/nonexistent/a.bin");
    /// let err = std::fs::read(path).map_err(Error::io("read", path)).unwrap_err();
    /// assert!(err.to_string().contains("read"));
    /// ```
    pub fn io<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Error + 'a {
        move |source| Error::IoFailure {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for errors raised by the file system
    pub fn is_io(&self) -> bool {
        matches!(self, Error::IoFailure { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
