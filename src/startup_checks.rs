use crate::Config;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Storage root does not exist: {0:?}")]
    StorageRootMissing(PathBuf),

    #[error("Storage root is not readable: {path:?}: {source}")]
    StorageRootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Image path prefix is empty")]
    EmptyPathPrefix,

    #[error("Transform timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Maximum source size must be greater than zero")]
    ZeroSizeCeiling,

    #[error("Watermark origin URL is invalid: {0}")]
    InvalidOriginUrl(String),

    #[error("Watermark cache key is empty")]
    EmptyWatermarkKey,
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    if let Some(root) = config.storage_root() {
        if !root.exists() {
            error!("Storage root does not exist: {:?}", root);
            errors.push(StartupCheckError::StorageRootMissing(root.clone()));
        } else {
            match tokio::fs::read_dir(root).await {
                Ok(_) => info!("Storage root is accessible: {:?}", root),
                Err(e) => {
                    error!("Storage root is not accessible: {}", e);
                    errors.push(StartupCheckError::StorageRootUnreadable {
                        path: root.clone(),
                        source: e,
                    });
                }
            }
        }
    } else {
        info!("Using in-memory storage");
    }

    let transform = &config.transform;
    if transform.normalized_prefix().is_empty() {
        errors.push(StartupCheckError::EmptyPathPrefix);
    }
    if transform.timeout_ms == 0 {
        errors.push(StartupCheckError::ZeroTimeout);
    }
    if transform.max_source_bytes == 0 {
        errors.push(StartupCheckError::ZeroSizeCeiling);
    }

    let origin_url = &config.watermark.origin_url;
    match reqwest::Url::parse(origin_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            info!("Watermark origin: {}", url);
        }
        Ok(url) => errors.push(StartupCheckError::InvalidOriginUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        ))),
        Err(e) => errors.push(StartupCheckError::InvalidOriginUrl(format!(
            "{}: {}",
            origin_url, e
        ))),
    }

    if config.watermark.cache_key.trim().is_empty() {
        errors.push(StartupCheckError::EmptyWatermarkKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageConfig;
    use tempfile::TempDir;

    fn config_with_root(root: PathBuf) -> Config {
        Config {
            storage: StorageConfig::Filesystem { root },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_existing_root_passes() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_with_root(temp_dir.path().to_path_buf());
        assert!(perform_startup_checks(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_backend_needs_no_root() {
        let config = Config {
            storage: StorageConfig::Memory,
            ..Default::default()
        };
        assert!(perform_startup_checks(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_with_root(temp_dir.path().join("does-not-exist"));
        let errors = perform_startup_checks(&config).await.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], StartupCheckError::StorageRootMissing(_)));
    }

    #[tokio::test]
    async fn test_collects_every_problem() {
        let mut config = Config {
            storage: StorageConfig::Memory,
            ..Default::default()
        };
        config.transform.path_prefix = "//".to_string();
        config.transform.timeout_ms = 0;
        config.transform.max_source_bytes = 0;
        config.watermark.origin_url = "ftp://example.com/logo.png".to_string();
        config.watermark.cache_key = " ".to_string();

        let errors = perform_startup_checks(&config).await.unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(matches!(errors[0], StartupCheckError::EmptyPathPrefix));
        assert!(matches!(errors[1], StartupCheckError::ZeroTimeout));
        assert!(matches!(errors[2], StartupCheckError::ZeroSizeCeiling));
        assert!(matches!(errors[3], StartupCheckError::InvalidOriginUrl(_)));
        assert!(matches!(errors[4], StartupCheckError::EmptyWatermarkKey));
    }

    #[tokio::test]
    async fn test_unparseable_origin_url() {
        let mut config = Config {
            storage: StorageConfig::Memory,
            ..Default::default()
        };
        config.watermark.origin_url = "not a url".to_string();
        let errors = perform_startup_checks(&config).await.unwrap_err();
        assert!(matches!(errors[0], StartupCheckError::InvalidOriginUrl(_)));
    }
}
