//! Durable storage for the raw uploaded statement bytes. The engine only
//! needs a `put`; retrieval and retention are administrative concerns.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::{EngineError, Result};

/// Blob storage seam. Implementations must be durable: a returned path is a
/// promise that the bytes can be retrieved later.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `bytes` under `path` and return the stored (possibly
    /// absolutized) path recorded on the statement.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<String>;
}

/// Filesystem-backed storage rooted at a configurable directory.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStorage for FsStorage {
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<String> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| EngineError::Storage(err.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|err| EngineError::Storage(err.to_string()))?;
        debug!("Stored {} byte(s) at {}", bytes.len(), target.display());
        Ok(target.to_string_lossy().into_owned())
    }
}

/// In-memory storage for tests and dry runs.
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.lock().expect("storage lock poisoned").contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.lock().expect("storage lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStorage for MemoryStorage {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<String> {
        self.files
            .lock()
            .expect("storage lock poisoned")
            .insert(path.to_string(), bytes.to_vec());
        Ok(path.to_string())
    }
}
