//! File-based object storage backend.
//!
//! Stores one file per object with a 2-level fan-out directory structure:
//! `{root}/{hex[0..2]}/{hex[2..4]}/{hex}`.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use mdag_types::Digest;
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::traits::Store;

/// File-based store with 2-level fan-out directory layout.
///
/// Writes are atomic: bytes go to a temporary file in the destination
/// directory first and are then linked into place without clobbering, so a
/// reader never observes a half-written object and two writers racing on the
/// same key both succeed.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    read_only: bool,
}

impl FileStore {
    /// Open a writable store rooted at `root`, creating the directory if
    /// it does not exist.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            read_only: false,
        })
    }

    /// Open an existing store for reading only. `put` fails with
    /// [`StoreError::ReadOnly`].
    pub fn open_read_only(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(StoreError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("store directory {} does not exist", root.display()),
            )));
        }
        Ok(Self {
            root,
            read_only: true,
        })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether this handle rejects writes.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Full file path for a key.
    pub fn object_path(&self, key: &Digest) -> PathBuf {
        let hex = key.to_hex();
        self.root.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }

    /// Every key currently on disk, sorted.
    ///
    /// Files whose names are not valid digests (leftover temp files,
    /// foreign files) are skipped.
    pub fn digests(&self) -> StoreResult<Vec<Digest>> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(3).max_depth(3) {
            let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(key) = entry
                .file_name()
                .to_str()
                .and_then(|name| Digest::from_hex(name).ok())
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl Store for FileStore {
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let path = self.object_path(key);
        if path.exists() {
            return Ok(());
        }
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::Backend(format!("no parent for {}", path.display())))?;
        std::fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                debug!(key = %key.short_hex(), size = value.len(), "stored object file");
                Ok(())
            }
            // Lost a race with an identical write.
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(StoreError::Io(e.error)),
        }
    }

    fn get(&self, key: &Digest) -> StoreResult<Option<Vec<u8>>> {
        match std::fs::read(self.object_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        match std::fs::metadata(self.object_path(key)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
