//! File-backed key-value store
//!
//! Each namespace lives in `<root>/<namespace>.json`. Writes go to a temporary
//! file in the same directory which is then renamed over the target, so a
//! reader never observes a half-written blob.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error};

use super::KeyValueStore;
use crate::constants::store;
use crate::errors::{StoreError, StoreResult};

/// Store rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DirectoryNotAccessible` if the directory cannot be
    /// created
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| {
                error!("Failed to create store directory: {}", e);
                StoreError::DirectoryNotAccessible { path: root.clone() }
            })?;
            debug!("Created store directory: {}", root.display());
        }
        Ok(Self { root })
    }

    /// Open the store in the default per-user location
    ///
    /// - macOS: ~/Library/Application Support/sharenite-mirror/store
    /// - Linux: ~/.config/sharenite-mirror/store
    /// - Windows: %APPDATA%/sharenite-mirror/store
    pub fn open_default() -> StoreResult<Self> {
        Self::open(Self::default_root()?)
    }

    /// Default per-user store directory
    pub fn default_root() -> StoreResult<PathBuf> {
        let root = dirs::config_dir()
            .ok_or_else(|| StoreError::DirectoryNotAccessible {
                path: PathBuf::from("system config directory"),
            })?
            .join("sharenite-mirror")
            .join("store");
        Ok(root)
    }

    /// Directory holding the namespace files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
                _ => '_',
            })
            .collect();
        self.root
            .join(format!("{}.{}", file_name, store::FILE_EXTENSION))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn write(&self, key: &str, blob: &str) -> StoreResult<()> {
        let final_path = self.path_for(key);

        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(blob.as_bytes())?;
        temp.flush()?;

        temp.persist(&final_path).map_err(|e| {
            error!("Failed to replace {}: {}", final_path.display(), e.error);
            StoreError::PersistFailure {
                namespace: key.to_string(),
                reason: e.error.to_string(),
            }
        })?;

        debug!("Wrote {} bytes to {}", blob.len(), final_path.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
