#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use imgcgi::engine::{DynTransformEngine, EncodedImage, EngineError, TransformEngine, TransformJob};
use imgcgi::pipeline::{ImagePipeline, PipelineLimits};
use imgcgi::storage::providers::memory::MemoryStore;
use imgcgi::storage::{BlobObject, BlobStore, DynBlobStore, StorageError};
use imgcgi::watermark::{DynWatermarkOrigin, WatermarkAsset, WatermarkAssets, WatermarkError, WatermarkOrigin};
use imgcgi::{Config, build_router};

pub const WATERMARK_KEY: &str = "watermark-cache/HappyLee-Logo.png";

pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Bytes {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    Bytes::from(buffer)
}

/// Engine double that records every job and answers with a fixed body.
#[derive(Default)]
pub struct RecordingEngine {
    pub jobs: Mutex<Vec<TransformJob>>,
    pub delay: Option<Duration>,
}

impl RecordingEngine {
    pub fn slow(delay: Duration) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn calls(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn last_job(&self) -> TransformJob {
        self.jobs.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl TransformEngine for RecordingEngine {
    async fn execute(&self, job: TransformJob) -> Result<EncodedImage, EngineError> {
        let content_type = job.output.format.mime_type().to_string();
        self.jobs.lock().unwrap().push(job);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(EncodedImage {
            bytes: Bytes::from_static(b"transformed"),
            content_type,
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Store wrapper counting reads and optionally failing reads of one key,
/// failing writes or inflating declared sizes.
pub struct CountingStore {
    pub inner: MemoryStore,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub fail_puts: bool,
    pub fail_get_key: Option<String>,
    pub declared_size: Option<u64>,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            fail_puts: false,
            fail_get_key: None,
            declared_size: None,
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<BlobObject>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get_key.as_deref() == Some(key) {
            return Err(StorageError::Backend("connection reset".to_string()));
        }
        let object = self.inner.get(key).await?;
        Ok(match self.declared_size {
            Some(size) => object.map(|o| o.with_declared_size(size)),
            None => object,
        })
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts {
            return Err(StorageError::Backend("read-only bucket".to_string()));
        }
        self.inner.put(key, bytes, content_type).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Origin double returning fixed bytes, or failing when `bytes` is `None`.
pub struct StaticOrigin {
    pub bytes: Option<Bytes>,
    pub calls: AtomicUsize,
}

impl StaticOrigin {
    pub fn serving(bytes: Bytes) -> Self {
        Self {
            bytes: Some(bytes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            bytes: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatermarkOrigin for StaticOrigin {
    async fn fetch(&self) -> Result<WatermarkAsset, WatermarkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.bytes {
            Some(bytes) => Ok(WatermarkAsset {
                bytes: bytes.clone(),
                content_type: "image/png".to_string(),
            }),
            None => Err(WatermarkError::OriginStatus(502)),
        }
    }

    fn describe(&self) -> &str {
        "static"
    }
}

pub fn test_config() -> Config {
    let mut config = Config {
        storage: imgcgi::StorageConfig::Memory,
        ..Default::default()
    };
    config.transform.max_source_bytes = 1024 * 1024;
    config
}

/// Router over the given collaborators.
pub fn server(
    config: Config,
    store: DynBlobStore,
    engine: DynTransformEngine,
    origin: DynWatermarkOrigin,
) -> TestServer {
    let watermarks = WatermarkAssets::new(store.clone(), origin, config.watermark.cache_key.clone());
    let pipeline = ImagePipeline::new(
        store,
        engine,
        watermarks,
        PipelineLimits::from_config(&config),
    );
    let app = build_router(config, Arc::new(pipeline));
    TestServer::new(app).unwrap()
}

/// Poll until `key` shows up in the store; write-backs run detached.
pub async fn wait_for_key(store: &MemoryStore, key: &str) -> bool {
    for _ in 0..100 {
        if store.contains(key).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
