use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder};
use std::io::Cursor;
use tracing::debug;

use super::EngineError;
use crate::format::OutputFormat;

/// Encode `image` in the requested format. PNG is lossless and ignores `quality`.
pub fn encode(
    image: &DynamicImage,
    format: OutputFormat,
    quality: u8,
    avif_speed: u8,
) -> Result<Vec<u8>, EngineError> {
    let quality = quality.clamp(1, 100);
    let bytes = match format {
        OutputFormat::Jpeg => encode_jpeg(image, quality)?,
        OutputFormat::Png => encode_png(image)?,
        OutputFormat::WebP => encode_webp(image, quality)?,
        OutputFormat::Avif => encode_avif(image, quality, avif_speed)?,
    };
    debug!(
        "Encoded {}x{} image as {}: {} bytes",
        image.width(),
        image.height(),
        format.extension(),
        bytes.len()
    );
    Ok(bytes)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, EngineError> {
    // JPEG doesn't support alpha channel, so convert to RGB
    let rgb_image = image.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(
            rgb_image.as_raw(),
            rgb_image.width(),
            rgb_image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| EngineError::encode("jpeg", e))?;
    Ok(buffer.into_inner())
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, EngineError> {
    let mut buffer = Vec::new();
    image
        .write_with_encoder(PngEncoder::new(&mut buffer))
        .map_err(|e| EngineError::encode("png", e))?;
    Ok(buffer)
}

fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, EngineError> {
    let rgba_image = image.to_rgba8();
    let (width, height) = rgba_image.dimensions();
    let encoder = webp::Encoder::from_rgba(rgba_image.as_raw(), width, height);
    let memory = encoder
        .encode_simple(false, f32::from(quality))
        .map_err(|e| EngineError::encode("webp", format!("{:?}", e)))?;
    Ok(memory.to_vec())
}

fn encode_avif(image: &DynamicImage, quality: u8, speed: u8) -> Result<Vec<u8>, EngineError> {
    let rgba_image = DynamicImage::ImageRgba8(image.to_rgba8());
    let mut buffer = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(&mut buffer, speed.clamp(1, 10), quality);
    rgba_image
        .write_with_encoder(encoder)
        .map_err(|e| EngineError::encode("avif", e))?;
    Ok(buffer)
}
