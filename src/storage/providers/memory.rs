use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::{BlobObject, BlobStore, StorageError};

/// Process-local store, mainly for development and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, (Bytes, String)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: impl Into<String>, bytes: Bytes, content_type: &str) {
        self.objects
            .write()
            .await
            .insert(key.into(), (bytes, content_type.to_string()));
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<BlobObject>, StorageError> {
        let objects = self.objects.read().await;
        Ok(objects
            .get(key)
            .map(|(bytes, content_type)| {
                BlobObject::buffered(bytes.clone(), Some(content_type.clone()))
            }))
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.insert(key, bytes, content_type).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
