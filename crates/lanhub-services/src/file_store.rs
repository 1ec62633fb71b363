//! Shared file store.
//!
//! A flat directory of arbitrary files, addressed by name:
//!   {files_dir}/{name}
//!
//! Nothing is cached in memory; existence, size and timestamps are read from
//! the filesystem on every call. Writes overwrite in place. Concurrent writers
//! to the same name race and the last one wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("invalid filename: {0:?}")]
    InvalidName(String),
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Live metadata for one stored file.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub size: u64,
    /// `None` where the filesystem does not record a birth time.
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
}

/// Directory-scoped file operations.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            op: "create",
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of every entry in the store, sorted.
    pub fn list(&self) -> StoreResult<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::Io {
            op: "list",
            path: self.root.clone(),
            source,
        })?;
        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Names containing `needle`, sorted.
    pub fn search(&self, needle: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|name| name.contains(needle))
            .collect())
    }

    pub fn exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self.path_for(name)?.is_file())
    }

    pub fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        let path = self.path_for(name)?;
        fs::read(&path).map_err(|e| io_error("read", name, path, e))
    }

    /// Write `data` under `name`, replacing any existing file.
    pub fn write(&self, name: &str, data: &[u8]) -> StoreResult<()> {
        let path = self.path_for(name)?;
        fs::write(&path, data).map_err(|e| io_error("write", name, path, e))?;
        tracing::debug!(name, bytes = data.len(), "file stored");
        Ok(())
    }

    pub fn delete(&self, name: &str) -> StoreResult<()> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).map_err(|e| io_error("delete", name, path, e))?;
        tracing::debug!(name, "file deleted");
        Ok(())
    }

    pub fn info(&self, name: &str) -> StoreResult<FileInfo> {
        let path = self.path_for(name)?;
        let meta = fs::metadata(&path).map_err(|e| io_error("stat", name, path, e))?;
        Ok(FileInfo {
            size: meta.len(),
            created: meta.created().ok(),
            modified: meta.modified().ok(),
        })
    }

    /// Resolve a name to a path directly under the root.
    ///
    /// Names must be a single path component.
    fn path_for(&self, name: &str) -> StoreResult<PathBuf> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0');
        if invalid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

fn io_error(op: &'static str, name: &str, path: PathBuf, source: io::Error) -> StoreError {
    if source.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(name.to_string())
    } else {
        StoreError::Io { op, path, source }
    }
}
