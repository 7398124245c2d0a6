use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{WatermarkAsset, WatermarkError};

const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// Where the watermark comes from when the blob store has no copy.
#[async_trait]
pub trait WatermarkOrigin: Send + Sync {
    async fn fetch(&self) -> Result<WatermarkAsset, WatermarkError>;
    fn describe(&self) -> &str;
}

pub type DynWatermarkOrigin = Arc<dyn WatermarkOrigin>;

/// Plain HTTP GET of a fixed URL.
pub struct HttpOrigin {
    client: reqwest::Client,
    url: String,
    cache_ttl: Duration,
}

impl HttpOrigin {
    pub fn new(
        url: impl Into<String>,
        cache_ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, WatermarkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WatermarkError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            cache_ttl,
        })
    }
}

#[async_trait]
impl WatermarkOrigin for HttpOrigin {
    async fn fetch(&self) -> Result<WatermarkAsset, WatermarkError> {
        debug!("Fetching watermark from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(
                header::CACHE_CONTROL,
                format!("max-age={}", self.cache_ttl.as_secs()),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatermarkError::OriginStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes: Bytes = response.bytes().await?;

        if bytes.is_empty() {
            return Err(WatermarkError::EmptyBody);
        }

        Ok(WatermarkAsset {
            bytes,
            content_type,
        })
    }

    fn describe(&self) -> &str {
        &self.url
    }
}
