use super::naming::{self, MAX_SUFFIXES};
use super::schema::FileInfo;
use super::staging::StagedFile;
use super::StorageError;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::{PathPersistError, TempPath};
use tokio::fs;

/// Subdirectory of the root holding in-flight writes.
pub const STAGING_DIR: &str = ".staging";

/// Manages the flat directory all documents live in.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    staging_dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) the storage root. Leftovers from writes that
    /// were interrupted by a crash are cleared from the staging directory.
    pub fn new(root: &str) -> Result<Self, StorageError> {
        let expanded = shellexpand::tilde(root).to_string();
        let root = PathBuf::from(expanded);
        let staging_dir = root.join(STAGING_DIR);
        std::fs::create_dir_all(&staging_dir)
            .map_err(|e| StorageError::io("create storage directory", &staging_dir, e))?;

        let storage = Self { root, staging_dir };
        storage.sweep_staging();
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sweep_staging(&self) {
        let Ok(entries) = std::fs::read_dir(&self.staging_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale staging file");
            } else {
                tracing::debug!(path = %path.display(), "Removed stale staging file");
            }
        }
    }

    /// Map a client-supplied name to a path directly inside the root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() {
            return Err(StorageError::InvalidInput("Filename cannot be empty".into()));
        }
        if name.contains(['/', '\\', '\0']) || name == "." || name == ".." || name == STAGING_DIR {
            return Err(StorageError::InvalidInput(format!("Invalid filename: {name}")));
        }
        Ok(self.root.join(name))
    }

    pub async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.resolve(name)?;
        match fs::symlink_metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io("inspect file", path, e)),
        }
    }

    /// Resolve `name` to an existing regular file.
    async fn locate_file(&self, name: &str) -> Result<(PathBuf, Metadata), StorageError> {
        let path = self.resolve(name)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(StorageError::io("inspect file", path, e)),
        };
        if !meta.is_file() {
            return Err(StorageError::NotAFile(name.to_string()));
        }
        Ok((path, meta))
    }

    pub async fn info(&self, name: &str) -> Result<FileInfo, StorageError> {
        let (path, meta) = self.locate_file(name).await?;
        file_info(name, &path, &meta)
    }

    /// All regular files in the root, newest first.
    pub async fn list(&self) -> Result<Vec<FileInfo>, StorageError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::io("read storage directory", &self.root, e))?;

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(StorageError::io("read storage directory", &self.root, e)),
            };
            let path = entry.path();
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(path = %path.display(), "Skipping file with non UTF-8 name");
                continue;
            };

            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => match file_info(&name, &path, &meta) {
                    Ok(info) => files.push(info),
                    Err(e) => tracing::warn!(file = %name, error = %e, "Error processing file"),
                },
                Ok(_) => {}
                Err(e) => tracing::warn!(file = %name, error = %e, "Error processing file"),
            }
        }

        files.sort_by(|a, b| b.updated.cmp(&a.updated).then_with(|| a.title.cmp(&b.title)));
        Ok(files)
    }

    /// Open a stored file for streaming, along with its metadata.
    pub async fn open(&self, name: &str) -> Result<(fs::File, FileInfo), StorageError> {
        let (path, meta) = self.locate_file(name).await?;
        let info = file_info(name, &path, &meta)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| StorageError::io("open file", &path, e))?;
        Ok((file, info))
    }

    pub async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let (path, _) = self.locate_file(name).await?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(name.to_string())),
            Err(e) => Err(StorageError::io("delete file", path, e)),
        }
    }

    /// Start a write. Nothing is visible in the root until the staged file is
    /// placed with [`place_unique`](Self::place_unique) or
    /// [`replace`](Self::replace).
    pub fn stage(&self) -> Result<StagedFile, StorageError> {
        StagedFile::create(&self.staging_dir)
    }

    /// Store the staged bytes under the first free name in `candidate`'s
    /// candidate sequence and return that name.
    ///
    /// Each attempt is an exclusive create, so concurrent callers with the same
    /// candidate always end up with distinct names.
    pub async fn place_unique(&self, staged: StagedFile, candidate: &str) -> Result<String, StorageError> {
        self.resolve(candidate)?;
        let temp = staged.finish().await?;
        let root = self.root.clone();
        let candidate = candidate.to_string();

        tokio::task::spawn_blocking(move || claim_first_free(temp, &root, &candidate))
            .await
            .map_err(|e| StorageError::io("place staged file", &self.root, std::io::Error::other(e)))?
    }

    /// Atomically swap the staged bytes in as `name`, replacing whatever was
    /// there. Readers see either the old content or the new, never a mix.
    pub async fn replace(&self, staged: StagedFile, name: &str) -> Result<(), StorageError> {
        let target = self.resolve(name)?;
        let temp = staged.finish().await?;

        tokio::task::spawn_blocking(move || {
            temp.persist(&target)
                .map_err(|e| StorageError::io("replace file", target, e.error))
        })
        .await
        .map_err(|e| StorageError::io("replace file", &self.root, std::io::Error::other(e)))?
    }
}

fn file_info(name: &str, path: &Path, meta: &Metadata) -> Result<FileInfo, StorageError> {
    let modified = meta
        .modified()
        .map_err(|e| StorageError::io("read modification time", path, e))?;
    Ok(FileInfo::new(name, meta.len(), modified))
}

fn claim_first_free(mut temp: TempPath, root: &Path, candidate: &str) -> Result<String, StorageError> {
    for name in naming::candidates(candidate) {
        let target = root.join(&name);
        match temp.persist_noclobber(&target) {
            Ok(()) => return Ok(name),
            Err(PathPersistError { error, path }) if error.kind() == ErrorKind::AlreadyExists => {
                temp = path;
            }
            Err(PathPersistError { error, .. }) => {
                return Err(StorageError::io("store file", target, error));
            }
        }
    }
    Err(StorageError::ResourceExhausted {
        candidate: candidate.to_string(),
        attempts: MAX_SUFFIXES,
    })
}
