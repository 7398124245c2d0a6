use crate::error::ProxyError;

/// Segment that turns on watermarking when it directly precedes the key.
pub const WATERMARK_SEGMENT: &str = "watermark";

/// What a single image request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformIntent {
    /// Storage key, percent-decoded once.
    pub source_key: String,
    pub size_token: String,
    pub watermark_requested: bool,
}

/// Parse a raw (still percent-encoded) path of the form
/// `/{prefix}/{size}[/watermark]/{key}`.
pub fn parse_request_path(path: &str, prefix: &str) -> Result<TransformIntent, ProxyError> {
    let malformed = || {
        ProxyError::MalformedRequest(format!(
            "Invalid URL format. Expected: /{prefix}/{{size}}[/watermark]/{{path-to-image}}"
        ))
    };

    let rest = path
        .strip_prefix('/')
        .and_then(|p| p.strip_prefix(prefix))
        .and_then(|p| p.strip_prefix('/'))
        .ok_or_else(malformed)?;

    let (size_token, remainder) = rest.split_once('/').ok_or_else(malformed)?;
    if size_token.is_empty() || remainder.is_empty() {
        return Err(malformed());
    }

    // `watermark/` only counts as the flag when a key follows it
    let (watermark_requested, encoded_key) = match remainder
        .strip_prefix(WATERMARK_SEGMENT)
        .and_then(|r| r.strip_prefix('/'))
    {
        Some(key) if !key.is_empty() => (true, key),
        _ => (false, remainder),
    };

    let source_key = urlencoding::decode(encoded_key)
        .map_err(|_| ProxyError::MalformedRequest("Invalid URL encoding in image path".into()))?
        .into_owned();

    Ok(TransformIntent {
        source_key,
        size_token: size_token.to_string(),
        watermark_requested,
    })
}
