//! Storage Engine — a single-directory document store served over HTTP.
//!
//! Uploads are sanitized and given collision-free names; a document server
//! reports edit sessions through callbacks that pull saved documents back
//! into the store.

pub mod callback;
pub mod config;
pub mod gateway;
pub mod storage;

pub use callback::{CallbackAck, CallbackEvent, CallbackSynchronizer};
pub use config::Config;
pub use storage::{FileInfo, FileStorage, StorageError};
