//! Document server callbacks.
//!
//! The editor reports session lifecycle changes to the track endpoint; saves
//! (statuses 2 and 6) are pulled from the editor and swapped into storage.
//! Whatever happens, the editor gets back `{"error":0}` or
//! `{"error":1,"message":...}`.

pub mod event;
pub mod synchronizer;

pub use event::{CallbackAck, CallbackEvent, CallbackPayload};
pub use synchronizer::CallbackSynchronizer;

use crate::storage::StorageError;
use thiserror::Error;

/// Why a callback was answered with `{"error":1}`.
#[derive(Debug, Error)]
pub enum CallbackRejection {
    #[error("Invalid callback body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("No URL provided")]
    MissingUrl,

    /// Status 3, reported by the editor itself
    #[error("Error during save")]
    EditorSaveError,

    /// Status 7, reported by the editor itself
    #[error("Error during force save")]
    EditorForceSaveError,

    #[error("Unknown callback status {0}")]
    UnknownStatus(i64),

    #[error("Download failed: {0}")]
    UpstreamFetch(#[from] reqwest::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
