pub mod error;
pub mod providers;

pub use error::StorageError;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Blob store backing the proxy: source images and the cached watermark.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when no object exists under `key`.
    async fn get(&self, key: &str) -> Result<Option<BlobObject>, StorageError>;
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;
    fn name(&self) -> &str;
}

pub type DynBlobStore = Arc<dyn BlobStore>;

/// A stored object. Size and content type are known before the body is read.
#[derive(Debug)]
pub struct BlobObject {
    pub size: u64,
    pub content_type: Option<String>,
    body: BlobBody,
}

#[derive(Debug)]
enum BlobBody {
    Buffered(Bytes),
    File(PathBuf),
}

impl BlobObject {
    pub fn buffered(bytes: Bytes, content_type: Option<String>) -> Self {
        Self {
            size: bytes.len() as u64,
            content_type,
            body: BlobBody::Buffered(bytes),
        }
    }

    pub fn file(path: PathBuf, size: u64, content_type: Option<String>) -> Self {
        Self {
            size,
            content_type,
            body: BlobBody::File(path),
        }
    }

    /// Override the size reported by store metadata.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub async fn read(self) -> Result<Bytes, StorageError> {
        match self.body {
            BlobBody::Buffered(bytes) => Ok(bytes),
            BlobBody::File(path) => Ok(Bytes::from(tokio::fs::read(&path).await?)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Filesystem { root: PathBuf },
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Filesystem {
            root: PathBuf::from("images"),
        }
    }
}

pub fn create_store(config: &StorageConfig) -> DynBlobStore {
    match config {
        StorageConfig::Filesystem { root } => {
            Arc::new(providers::filesystem::FilesystemStore::new(root.clone()))
        }
        StorageConfig::Memory => Arc::new(providers::memory::MemoryStore::new()),
    }
}
