use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod cache;
pub mod engine;
pub mod error;
pub mod format;
pub mod handlers;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod size_policy;
pub mod startup_checks;
pub mod storage;
pub mod watermark;

pub use cache::EtagScheme;
pub use error::ProxyError;
pub use pipeline::ImagePipeline;
pub use storage::StorageConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformConfig {
    /// First path segment of image URLs, without slashes.
    pub path_prefix: String,
    /// Deadline for one request, measured from the start of the source fetch.
    pub timeout_ms: u64,
    pub max_source_bytes: u64,
    /// Width used to pick a watermark tier when the output keeps its original size.
    pub default_watermark_width: u32,
    pub avif_speed: u8,
    pub etag_scheme: EtagScheme,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Blob store key the watermark is cached under.
    pub cache_key: String,
    pub origin_url: String,
    pub origin_cache_ttl_secs: u64,
    pub origin_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "imgcgi".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            path_prefix: "img-cgi".to_string(),
            timeout_ms: 25_000,
            max_source_bytes: 50 * 1024 * 1024,
            default_watermark_width: 1920,
            avif_speed: 8,
            etag_scheme: EtagScheme::default(),
        }
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            cache_key: "watermark-cache/HappyLee-Logo.png".to_string(),
            origin_url: "https://i.happylee.blog/assets/HappyLee-Logo.png".to_string(),
            origin_cache_ttl_secs: 86_400,
            origin_timeout_secs: 10,
        }
    }
}

impl TransformConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Prefix with surrounding slashes removed.
    pub fn normalized_prefix(&self) -> &str {
        self.path_prefix.trim_matches('/')
    }
}

impl Config {
    pub fn storage_root(&self) -> Option<&PathBuf> {
        match &self.storage {
            StorageConfig::Filesystem { root } => Some(root),
            StorageConfig::Memory => None,
        }
    }
}

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ImagePipeline>,
    pub config: Arc<Config>,
}

/// Builds the collaborators from `config` and returns the router.
pub async fn create_app(config: Config) -> Result<Router, ProxyError> {
    let pipeline = Arc::new(ImagePipeline::from_config(&config)?);
    Ok(build_router(config, pipeline))
}

/// Router over an already-assembled pipeline.
pub fn build_router(config: Config, pipeline: Arc<ImagePipeline>) -> Router {
    let image_route = format!("/{}/{{*path}}", config.transform.normalized_prefix());

    let app_state = AppState {
        pipeline,
        config: Arc::new(config),
    };

    Router::new()
        .route("/healthz", axum::routing::get(handlers::health_handler))
        .route(&image_route, axum::routing::get(handlers::image_handler))
        .fallback(handlers::image_handler)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let headers = request.headers();
                    let user_agent = headers
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");
                    let referer = headers
                        .get("referer")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        user_agent = %user_agent,
                        referer = %referer,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
