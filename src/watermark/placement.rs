use bytes::Bytes;

use crate::engine::{FitMode, Overlay, ResizeOptions};

/// Overlay geometry for one output width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkPlacement {
    pub overlay_width: u32,
    pub overlay_height: u32,
    pub opacity: f32,
    pub offset_bottom: u32,
    pub offset_right: u32,
}

impl WatermarkPlacement {
    const fn tier(size: u32, opacity: f32, offset: u32) -> Self {
        Self {
            overlay_width: size,
            overlay_height: size,
            opacity,
            offset_bottom: offset,
            offset_right: offset,
        }
    }

    pub fn resolve(width: u32) -> Self {
        match width {
            0..=320 => Self::tier(40, 0.6, 5),
            321..=640 => Self::tier(60, 0.7, 8),
            641..=1280 => Self::tier(80, 0.8, 12),
            _ => Self::tier(100, 0.8, 15),
        }
    }

    /// The watermark is fit inside the placement box, keeping its aspect ratio.
    pub fn to_overlay(&self, image: Bytes) -> Overlay {
        Overlay {
            image,
            resize: ResizeOptions::exact(self.overlay_width, self.overlay_height, FitMode::Contain),
            opacity: self.opacity,
            bottom: self.offset_bottom,
            right: self.offset_right,
        }
    }
}
