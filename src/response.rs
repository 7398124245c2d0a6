use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::cache::CacheValidator;
use crate::error::ProxyError;
use crate::pipeline::ImageOutput;

pub const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";
pub const CACHE_CONTROL_NO_CACHE: &str = "no-cache";
pub const RETRY_AFTER_SECS: &str = "60";

fn validator_headers(validator: &CacheValidator) -> [(header::HeaderName, HeaderValue); 3] {
    let etag = HeaderValue::from_str(validator.etag())
        .unwrap_or_else(|_| HeaderValue::from_static("\"\""));
    [
        (header::ETAG, etag),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_IMMUTABLE),
        ),
        (header::VARY, HeaderValue::from_static("Accept")),
    ]
}

pub fn image(output: ImageOutput, validator: &CacheValidator) -> Response {
    let content_type = HeaderValue::from_str(&output.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    (
        StatusCode::OK,
        validator_headers(validator),
        [(header::CONTENT_TYPE, content_type)],
        Body::from(output.bytes),
    )
        .into_response()
}

pub fn not_modified(validator: &CacheValidator) -> Response {
    (StatusCode::NOT_MODIFIED, validator_headers(validator)).into_response()
}

impl ProxyError {
    /// Short body safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            ProxyError::ConfigurationMissing(_) => "Server configuration error".to_string(),
            ProxyError::MalformedRequest(message) => message.clone(),
            ProxyError::UnsupportedSize(_) => "Invalid size parameter".to_string(),
            ProxyError::NotFound => "Image not found".to_string(),
            ProxyError::PayloadTooLarge { max, .. } => {
                format!("Image too large (max {}MB)", max / (1024 * 1024))
            }
            ProxyError::ProcessingTimeout(_) => {
                "Image processing timeout - image may be too large or complex".to_string()
            }
            ProxyError::InternalError(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() || self.is_retryable() {
            error!("Request failed with {}: {}", status, self);
        } else {
            warn!("Request rejected with {}: {}", status, self);
        }

        let body = self.public_message();
        let content_type = [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )];

        if self.is_retryable() {
            return (
                status,
                content_type,
                [
                    (
                        header::CACHE_CONTROL,
                        HeaderValue::from_static(CACHE_CONTROL_NO_CACHE),
                    ),
                    (header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS)),
                ],
                body,
            )
                .into_response();
        }

        (status, content_type, body).into_response()
    }
}
