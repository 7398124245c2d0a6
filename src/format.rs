/// Encodings the proxy can emit, in negotiation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Avif,
    WebP,
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Pick the output format from an `Accept` header: the first of
    /// avif, webp, png mentioned anywhere in the header, else JPEG.
    pub fn negotiate(accept_header: Option<&str>) -> Self {
        let accept = accept_header.unwrap_or("");
        if accept.contains("image/avif") {
            OutputFormat::Avif
        } else if accept.contains("image/webp") {
            OutputFormat::WebP
        } else if accept.contains("image/png") {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Avif => "avif",
            OutputFormat::WebP => "webp",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Avif => "image/avif",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}
