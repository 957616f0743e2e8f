//! Persistent key-value store and its typed adapter
//!
//! Both engines persist through a process-wide, synchronous, string-keyed
//! store. Writes are whole-value overwrites (last writer wins), so callers that
//! share a namespace must read, merge, then write.
//!
//! - [`KeyValueStore`] - the collaborator trait
//! - [`MemoryStore`] - in-process store for tests and ephemeral use
//! - [`FileStore`] - one JSON file per namespace with atomic replacement
//! - [`JsonStore`] - serde adapter used by the engines

pub mod file;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::errors::StoreResult;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Durable, synchronous, string-keyed blob store
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Read the blob stored under `key`
    fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replace the blob stored under `key`
    fn write(&self, key: &str, blob: &str) -> StoreResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Typed JSON view over a shared [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct JsonStore {
    inner: Arc<dyn KeyValueStore>,
}

impl JsonStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// Read and decode a namespace
    ///
    /// Unreadable or corrupt blobs are logged and reported as absent, matching
    /// how a fresh install behaves.
    pub fn load<T: DeserializeOwned>(&self, namespace: &str) -> Option<T> {
        let blob = match self.inner.read(namespace) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read '{}' from store: {}", namespace, e);
                return None;
            }
        };

        match serde_json::from_str(&blob) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding unreadable '{}' blob: {}", namespace, e);
                None
            }
        }
    }

    /// Encode and write a namespace
    pub fn save<T: Serialize>(&self, namespace: &str, value: &T) -> StoreResult<()> {
        let blob = serde_json::to_string(value)?;
        self.inner.write(namespace, &blob)
    }

    /// Remove a namespace
    pub fn remove(&self, namespace: &str) -> StoreResult<()> {
        self.inner.delete(namespace)
    }
}
