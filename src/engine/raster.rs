use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageReader, imageops::FilterType};
use std::io::Cursor;
use tracing::debug;

use super::{
    EncodedImage, EngineError, FitMode, Overlay, ResizeOptions, TransformEngine, TransformJob,
    encode,
};

/// In-process engine built on the `image` crate. Jobs run on the blocking pool.
#[derive(Debug, Clone)]
pub struct RasterEngine {
    avif_speed: u8,
}

impl RasterEngine {
    pub fn new(avif_speed: u8) -> Self {
        Self { avif_speed }
    }
}

impl Default for RasterEngine {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl TransformEngine for RasterEngine {
    async fn execute(&self, job: TransformJob) -> Result<EncodedImage, EngineError> {
        let avif_speed = self.avif_speed;
        tokio::task::spawn_blocking(move || render(job, avif_speed))
            .await
            .map_err(|e| EngineError::TaskFailed(e.to_string()))?
    }

    fn name(&self) -> &str {
        "raster"
    }
}

/// Run a job synchronously.
pub fn render(job: TransformJob, avif_speed: u8) -> Result<EncodedImage, EngineError> {
    let image = decode(&job.input)?;
    debug!(
        "Decoded source {}x{}, resize: {:?}",
        image.width(),
        image.height(),
        job.resize
    );

    let image = match job.resize {
        Some(options) => resize(image, options),
        None => image,
    };

    let image = match &job.overlay {
        Some(overlay) => composite(image, overlay)?,
        None => image,
    };

    let format = job.output.format;
    let bytes = encode::encode(&image, format, job.output.quality, avif_speed)?;

    Ok(EncodedImage {
        bytes: Bytes::from(bytes),
        content_type: format.mime_type().to_string(),
    })
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, EngineError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| EngineError::Decode(e.to_string()))?;
    reader
        .decode()
        .map_err(|e| EngineError::Decode(e.to_string()))
}

/// Box the output must fit, filling a missing side from the source aspect ratio.
pub(crate) fn target_box(source: (u32, u32), options: ResizeOptions) -> (u32, u32) {
    let (src_w, src_h) = source;
    let scale = |value: u32, num: u32, den: u32| -> u32 {
        if den == 0 {
            return value.max(1);
        }
        let scaled = (u64::from(value) * u64::from(num) + u64::from(den) / 2) / u64::from(den);
        u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
    };

    match (options.width, options.height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, scale(src_h, w, src_w)),
        (None, Some(h)) => (scale(src_w, h, src_h), h),
        (None, None) => (src_w, src_h),
    }
}

fn resize(image: DynamicImage, options: ResizeOptions) -> DynamicImage {
    let source = (image.width(), image.height());
    let (box_w, box_h) = target_box(source, options);

    match options.fit {
        FitMode::Cover => image.resize_to_fill(box_w, box_h, FilterType::Lanczos3),
        FitMode::Contain => image.resize(box_w, box_h, FilterType::Lanczos3),
        FitMode::ScaleDown => {
            // Don't upscale
            if box_w >= source.0 && box_h >= source.1 {
                image
            } else {
                image.resize(box_w, box_h, FilterType::Lanczos3)
            }
        }
    }
}

fn composite(image: DynamicImage, overlay: &Overlay) -> Result<DynamicImage, EngineError> {
    let mark = resize(decode(&overlay.image)?, overlay.resize);
    let mut mark = mark.to_rgba8();

    let opacity = overlay.opacity.clamp(0.0, 1.0);
    for pixel in mark.pixels_mut() {
        pixel[3] = (f32::from(pixel[3]) * opacity).round() as u8;
    }

    let mut base = image.to_rgba8();
    let x = i64::from(base.width()) - i64::from(mark.width()) - i64::from(overlay.right);
    let y = i64::from(base.height()) - i64::from(mark.height()) - i64::from(overlay.bottom);
    debug!(
        "Compositing {}x{} overlay at ({}, {}) with opacity {}",
        mark.width(),
        mark.height(),
        x,
        y,
        opacity
    );
    image::imageops::overlay(&mut base, &mark, x, y);

    Ok(DynamicImage::ImageRgba8(base))
}
