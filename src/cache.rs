use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::request::TransformIntent;

/// Length of the fingerprint inside the quotes.
const FINGERPRINT_LEN: usize = 16;

/// How the ETag fingerprint is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EtagScheme {
    /// SHA-256 over source key, size token and watermark flag.
    #[default]
    IdentityHash,
    /// Leading characters of the base64-encoded raw path. Requests sharing
    /// their first twelve path bytes collide, so it only exists to keep
    /// validators issued by earlier deployments valid.
    PathPrefix,
}

/// Entity tag for one request identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValidator {
    etag: String,
}

impl CacheValidator {
    pub fn for_intent(intent: &TransformIntent, raw_path: &str, scheme: EtagScheme) -> Self {
        let fingerprint = match scheme {
            EtagScheme::IdentityHash => identity_fingerprint(intent),
            EtagScheme::PathPrefix => path_prefix_fingerprint(raw_path),
        };
        Self {
            etag: format!("\"{fingerprint}\""),
        }
    }

    /// Quoted entity tag, ready for the `ETag` header.
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Weak comparison against the tags listed in `If-None-Match`.
    pub fn matches(&self, if_none_match: Option<&str>) -> bool {
        let Some(header) = if_none_match else {
            return false;
        };
        header
            .split(',')
            .map(|tag| tag.trim())
            .map(|tag| tag.strip_prefix("W/").unwrap_or(tag))
            .any(|tag| tag == self.etag)
    }
}

fn identity_fingerprint(intent: &TransformIntent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(intent.source_key.as_bytes());
    hasher.update([0u8]);
    hasher.update(intent.size_token.as_bytes());
    hasher.update([0u8]);
    hasher.update([u8::from(intent.watermark_requested)]);
    let digest = format!("{:x}", hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}

fn path_prefix_fingerprint(raw_path: &str) -> String {
    STANDARD
        .encode(raw_path)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(FINGERPRINT_LEN)
        .collect()
}
