// Watermark asset lookup: blob store cache first, then the origin
pub mod origin;
pub mod placement;

pub use origin::{DynWatermarkOrigin, HttpOrigin, WatermarkOrigin};
pub use placement::WatermarkPlacement;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{DynBlobStore, StorageError};

#[derive(Debug, Clone)]
pub struct WatermarkAsset {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Origin request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Origin returned status {0}")]
    OriginStatus(u16),

    #[error("Origin returned an empty body")]
    EmptyBody,

    #[error("Watermark is not a decodable image: {0}")]
    Undecodable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct WatermarkAssets {
    store: DynBlobStore,
    origin: DynWatermarkOrigin,
    cache_key: String,
}

impl WatermarkAssets {
    pub fn new(store: DynBlobStore, origin: DynWatermarkOrigin, cache_key: impl Into<String>) -> Self {
        Self {
            store,
            origin,
            cache_key: cache_key.into(),
        }
    }

    /// `None` means the watermark is unavailable and the request should
    /// proceed without one.
    pub async fn resolve(&self) -> Option<WatermarkAsset> {
        match self.lookup().await {
            Ok(asset) => Some(asset),
            Err(e) => {
                warn!("Watermark unavailable, serving without it: {}", e);
                None
            }
        }
    }

    async fn lookup(&self) -> Result<WatermarkAsset, WatermarkError> {
        match self.load_cached().await {
            Ok(Some(asset)) => match verify(&asset).await {
                Ok(()) => {
                    debug!("Watermark served from cache key {}", self.cache_key);
                    return Ok(asset);
                }
                Err(e) => warn!("Cached watermark is unusable, trying origin: {}", e),
            },
            Ok(None) => debug!("Watermark not cached under {}", self.cache_key),
            Err(e) => warn!("Watermark cache read failed, trying origin: {}", e),
        }

        let asset = self.origin.fetch().await?;
        verify(&asset).await?;
        debug!(
            "Fetched watermark from {} ({} bytes)",
            self.origin.describe(),
            asset.bytes.len()
        );
        self.spawn_write_back(&asset);
        Ok(asset)
    }

    async fn load_cached(&self) -> Result<Option<WatermarkAsset>, WatermarkError> {
        let Some(object) = self.store.get(&self.cache_key).await? else {
            return Ok(None);
        };
        let content_type = object
            .content_type
            .clone()
            .unwrap_or_else(|| "image/png".to_string());
        let bytes = object.read().await?;
        Ok(Some(WatermarkAsset {
            bytes,
            content_type,
        }))
    }

    /// Overwrites whatever the cache held, including an unusable copy.
    fn spawn_write_back(&self, asset: &WatermarkAsset) {
        let store = self.store.clone();
        let key = self.cache_key.clone();
        let asset = asset.clone();

        tokio::spawn(async move {
            match store.put(&key, asset.bytes, &asset.content_type).await {
                Ok(()) => debug!("Cached watermark under {}", key),
                Err(e) => warn!("Failed to cache watermark under {}: {}", key, e),
            }
        });
    }
}

/// Fully decode the asset so a bad copy never reaches the engine.
async fn verify(asset: &WatermarkAsset) -> Result<(), WatermarkError> {
    let bytes = asset.bytes.clone();
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes).map(|_| ()))
        .await
        .map_err(|e| WatermarkError::Undecodable(e.to_string()))?
        .map_err(|e| WatermarkError::Undecodable(e.to_string()))
}
