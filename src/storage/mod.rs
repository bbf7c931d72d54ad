//! Storage — the single-directory file store.
//!
//! Handles filename normalization, collision-free allocation, staged writes
//! with atomic placement, and the metadata exposed to list/download callers.

pub mod naming;
pub mod schema;
pub mod staging;
pub mod store;

pub use naming::{allocate_unique, sanitize};
pub use schema::{FileInfo, UploadReceipt};
pub use staging::StagedFile;
pub use store::FileStorage;

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the storage root.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Empty or unsafe filename
    #[error("{0}")]
    InvalidInput(String),

    #[error("File does not exist: {0}")]
    NotFound(String),

    /// The name exists but is a directory or other special entry
    #[error("Not a valid file: {0}")]
    NotAFile(String),

    #[error("Unable to generate unique filename for {candidate} after {attempts} attempts")]
    ResourceExhausted { candidate: String, attempts: u32 },

    #[error("Failed to {context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Client-side mistakes, as opposed to failures of the store itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::NotFound(_) | Self::NotAFile(_)
        )
    }
}
