use crate::engine::{FitMode, ResizeOptions};
use crate::error::ProxyError;
use crate::format::OutputFormat;

/// Widths served under their own token.
pub const PRESET_WIDTHS: [u32; 8] = [320, 480, 640, 768, 960, 1280, 1920, 2560];

/// Largest width accepted as a bare number.
pub const MAX_NUMERIC_WIDTH: u32 = 3000;

pub const THUMB_TOKEN: &str = "thumb";
pub const SQUARE_TOKEN: &str = "square";
pub const ORIGINAL_TOKEN: &str = "original";

const THUMB_QUALITY: u8 = 80;
const LARGE_QUALITY: u8 = 90;
const DEFAULT_QUALITY: u8 = 85;
const LARGE_WIDTH: u32 = 1280;

/// Geometry a size token asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    Resize(ResizeOptions),
    /// Keep the source dimensions.
    Original,
}

impl SizePolicy {
    pub fn resolve(size_token: &str) -> Result<Self, ProxyError> {
        let resize = match size_token {
            ORIGINAL_TOKEN => return Ok(SizePolicy::Original),
            THUMB_TOKEN => ResizeOptions::exact(300, 200, FitMode::Cover),
            SQUARE_TOKEN => ResizeOptions::exact(400, 400, FitMode::Cover),
            token => ResizeOptions::width(parse_width(token)?),
        };
        Ok(SizePolicy::Resize(resize))
    }
}

fn parse_width(token: &str) -> Result<u32, ProxyError> {
    let unsupported = || ProxyError::UnsupportedSize(token.to_string());

    if let Some(width) = PRESET_WIDTHS.iter().find(|w| w.to_string() == token) {
        return Ok(*width);
    }
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unsupported());
    }
    match token.parse::<u32>() {
        Ok(width) if (1..=MAX_NUMERIC_WIDTH).contains(&width) => Ok(width),
        _ => Err(unsupported()),
    }
}

/// Fully resolved output description for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Option<FitMode>,
    pub quality: u8,
    pub output_format: OutputFormat,
}

impl TransformSpec {
    /// Combine the size policy with the negotiated format and quality.
    pub fn build(policy: &SizePolicy, size_token: &str, accept_header: Option<&str>) -> Self {
        let (width, height, fit) = match policy {
            SizePolicy::Resize(resize) => (resize.width, resize.height, Some(resize.fit)),
            SizePolicy::Original => (None, None, None),
        };

        Self {
            width,
            height,
            fit,
            quality: select_quality(size_token, width),
            output_format: OutputFormat::negotiate(accept_header),
        }
    }

    /// True when there are no dimensions to apply.
    pub fn is_passthrough(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    pub fn resize_options(&self) -> Option<ResizeOptions> {
        if self.is_passthrough() {
            return None;
        }
        Some(ResizeOptions {
            width: self.width,
            height: self.height,
            fit: self.fit.unwrap_or(FitMode::ScaleDown),
        })
    }
}

pub fn select_quality(size_token: &str, width: Option<u32>) -> u8 {
    if size_token == THUMB_TOKEN {
        THUMB_QUALITY
    } else if width.is_some_and(|w| w >= LARGE_WIDTH) {
        LARGE_QUALITY
    } else {
        DEFAULT_QUALITY
    }
}
