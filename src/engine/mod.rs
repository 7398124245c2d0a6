// Transform engine - decode, resize, composite and encode raster images
pub mod encode;
mod error;
pub mod raster;

pub use error::EngineError;
pub use raster::RasterEngine;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::format::OutputFormat;

/// How requested dimensions are reconciled with the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// Fill the box, cropping overflow.
    Cover,
    /// Fit inside the box, enlarging if needed.
    Contain,
    /// Fit inside the box, never enlarging.
    ScaleDown,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Cover => "cover",
            FitMode::Contain => "contain",
            FitMode::ScaleDown => "scale-down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
}

impl ResizeOptions {
    /// Width-only, scale-down.
    pub fn width(width: u32) -> Self {
        Self {
            width: Some(width),
            height: None,
            fit: FitMode::ScaleDown,
        }
    }

    pub fn exact(width: u32, height: u32, fit: FitMode) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            fit,
        }
    }
}

/// A second image drawn over the output, anchored at the bottom-right corner.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub image: Bytes,
    pub resize: ResizeOptions,
    pub opacity: f32,
    pub bottom: u32,
    pub right: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub quality: u8,
}

/// Everything the engine needs to produce one output image.
#[derive(Debug, Clone)]
pub struct TransformJob {
    pub input: Bytes,
    pub resize: Option<ResizeOptions>,
    pub overlay: Option<Overlay>,
    pub output: OutputOptions,
}

#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait TransformEngine: Send + Sync {
    async fn execute(&self, job: TransformJob) -> Result<EncodedImage, EngineError>;
    fn name(&self) -> &str;
}

pub type DynTransformEngine = Arc<dyn TransformEngine>;
