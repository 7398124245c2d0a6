use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::Config;
use crate::engine::{DynTransformEngine, OutputOptions, RasterEngine, TransformJob};
use crate::error::ProxyError;
use crate::request::TransformIntent;
use crate::size_policy::TransformSpec;
use crate::storage::{DynBlobStore, create_store};
use crate::watermark::{HttpOrigin, WatermarkAssets, WatermarkPlacement};

const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Copy)]
pub struct PipelineLimits {
    pub timeout: Duration,
    pub max_source_bytes: u64,
    pub default_watermark_width: u32,
}

impl PipelineLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.transform.timeout(),
            max_source_bytes: config.transform.max_source_bytes,
            default_watermark_width: config.transform.default_watermark_width,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageOutput {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Fetches the source, resolves the watermark and drives the engine under
/// one deadline.
pub struct ImagePipeline {
    store: DynBlobStore,
    engine: DynTransformEngine,
    watermarks: WatermarkAssets,
    limits: PipelineLimits,
}

impl ImagePipeline {
    pub fn new(
        store: DynBlobStore,
        engine: DynTransformEngine,
        watermarks: WatermarkAssets,
        limits: PipelineLimits,
    ) -> Self {
        Self {
            store,
            engine,
            watermarks,
            limits,
        }
    }

    /// The only place production collaborators are constructed.
    pub fn from_config(config: &Config) -> Result<Self, ProxyError> {
        let store = create_store(&config.storage);
        let engine: DynTransformEngine = Arc::new(RasterEngine::new(config.transform.avif_speed));
        let origin = HttpOrigin::new(
            config.watermark.origin_url.clone(),
            Duration::from_secs(config.watermark.origin_cache_ttl_secs),
            Duration::from_secs(config.watermark.origin_timeout_secs),
        )
        .map_err(|e| ProxyError::ConfigurationMissing(format!("watermark origin: {}", e)))?;

        let watermarks = WatermarkAssets::new(
            store.clone(),
            Arc::new(origin),
            config.watermark.cache_key.clone(),
        );

        debug!(
            "Image pipeline ready: store={}, engine={}",
            store.name(),
            engine.name()
        );

        Ok(Self::new(
            store,
            engine,
            watermarks,
            PipelineLimits::from_config(config),
        ))
    }

    /// Runs the request under the configured deadline. On expiry the work in
    /// flight is dropped; engine jobs already on the blocking pool finish on
    /// their own.
    pub async fn run(
        &self,
        intent: &TransformIntent,
        spec: &TransformSpec,
    ) -> Result<ImageOutput, ProxyError> {
        let timeout = self.limits.timeout;
        match tokio::time::timeout(timeout, self.execute(intent, spec)).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Processing {} ({}) exceeded {}ms",
                    intent.source_key,
                    intent.size_token,
                    timeout.as_millis()
                );
                Err(ProxyError::ProcessingTimeout(timeout))
            }
        }
    }

    async fn execute(
        &self,
        intent: &TransformIntent,
        spec: &TransformSpec,
    ) -> Result<ImageOutput, ProxyError> {
        let max = self.limits.max_source_bytes;

        let object = self
            .store
            .get(&intent.source_key)
            .await?
            .ok_or(ProxyError::NotFound)?;

        if object.size > max {
            return Err(ProxyError::PayloadTooLarge {
                size: object.size,
                max,
            });
        }

        let source_type = object.content_type.clone();
        let input = object.read().await?;
        if input.len() as u64 > max {
            return Err(ProxyError::PayloadTooLarge {
                size: input.len() as u64,
                max,
            });
        }

        let watermark = if intent.watermark_requested {
            self.watermarks.resolve().await
        } else {
            None
        };

        if spec.is_passthrough() && watermark.is_none() {
            debug!("Passing {} through untouched", intent.source_key);
            return Ok(ImageOutput {
                bytes: input,
                content_type: source_type.unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
            });
        }

        let overlay = watermark.map(|asset| {
            let width = spec.width.unwrap_or(self.limits.default_watermark_width);
            WatermarkPlacement::resolve(width).to_overlay(asset.bytes)
        });

        let job = TransformJob {
            input,
            resize: spec.resize_options(),
            overlay,
            output: OutputOptions {
                format: spec.output_format,
                quality: spec.quality,
            },
        };

        debug!(
            "Transforming {}: resize={:?}, watermark={}, format={}, quality={}",
            intent.source_key,
            job.resize,
            job.overlay.is_some(),
            spec.output_format.extension(),
            spec.quality
        );

        let encoded = self.engine.execute(job).await.map_err(|e| {
            error!("Engine failed on {}: {}", intent.source_key, e);
            ProxyError::from(e)
        })?;

        Ok(ImageOutput {
            bytes: encoded.bytes,
            content_type: encoded.content_type,
        })
    }
}
