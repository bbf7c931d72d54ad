use super::StorageError;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// Bytes on their way into the storage root.
///
/// The temporary file lives in the root's staging directory and is removed
/// when this value (or the path it finishes into) is dropped without being
/// placed, so an abandoned request never leaves a half-written file behind.
pub struct StagedFile {
    file: tokio::fs::File,
    path: TempPath,
    len: u64,
}

impl StagedFile {
    pub(crate) fn create(staging_dir: &Path) -> Result<Self, StorageError> {
        let named = tempfile::Builder::new()
            .prefix("incoming-")
            .suffix(".part")
            .tempfile_in(staging_dir)
            .map_err(|e| StorageError::io("create staging file", staging_dir, e))?;
        let (file, path) = named.into_parts();
        Ok(Self {
            file: tokio::fs::File::from_std(file),
            path,
            len: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| StorageError::io("write staging file", &*self.path, e))?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Flush and sync, closing the handle. The returned path still deletes
    /// itself on drop until it is persisted.
    pub(crate) async fn finish(mut self) -> Result<TempPath, StorageError> {
        self.file
            .flush()
            .await
            .map_err(|e| StorageError::io("flush staging file", &*self.path, e))?;
        self.file
            .sync_all()
            .await
            .map_err(|e| StorageError::io("sync staging file", &*self.path, e))?;
        Ok(self.path)
    }
}
