//! Configuration module
//!
//! Settings for raw-file storage, upload limits and the remote stores,
//! loaded from the environment (and `.env` via dotenvy).

use std::env;

use crate::constants::{
    DEFAULT_MAX_DOCUMENT_SIZE_MB, DEFAULT_S3_BUCKET, DEFAULT_S3_ENDPOINT, DEFAULT_S3_REGION,
};
use crate::storage_types::StorageBackend;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_ARTICLES_PATH: &str = "/articles";
const DEFAULT_MATERIALS_PATH: &str = "/materials";
const DEFAULT_MESSAGES_PATH: &str = "/messages";
const DEFAULT_UPLOAD_PATH: &str = "/upload-to-s3";

/// Locations of the remote functions backing the article, material and
/// message stores and the raw upload endpoint.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub articles_path: String,
    pub materials_path: String,
    pub messages_path: String,
    pub upload_path: String,
}

#[derive(Clone, Debug)]
pub struct PedlabConfig {
    pub environment: String,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Ingestion limits
    pub max_document_size_bytes: usize,
    pub remote: RemoteConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<PedlabConfig>);

impl Config {
    fn as_pedlab(&self) -> &PedlabConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_pedlab().environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = PedlabConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_pedlab().validate()
    }

    pub fn environment(&self) -> &str {
        &self.as_pedlab().environment
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.as_pedlab().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_pedlab().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_pedlab().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_pedlab().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_pedlab().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_pedlab().local_storage_base_url.as_deref()
    }

    pub fn max_document_size_bytes(&self) -> usize {
        self.as_pedlab().max_document_size_bytes
    }

    pub fn remote(&self) -> &RemoteConfig {
        &self.as_pedlab().remote
    }
}

impl PedlabConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(value) => Some(value.parse::<StorageBackend>()?),
            None => None,
        };

        let max_document_size_mb = match var("MAX_DOCUMENT_SIZE_MB") {
            Some(value) => value.trim().parse::<usize>().map_err(|_| {
                anyhow::anyhow!("MAX_DOCUMENT_SIZE_MB must be a valid number, got {:?}", value)
            })?,
            None => DEFAULT_MAX_DOCUMENT_SIZE_MB,
        };

        let remote = RemoteConfig {
            api_url: var("PEDLAB_API_URL")
                .or_else(|| var("API_URL"))
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: var("PEDLAB_API_KEY").filter(|key| !key.is_empty()),
            articles_path: var("PEDLAB_ARTICLES_PATH")
                .unwrap_or_else(|| DEFAULT_ARTICLES_PATH.to_string()),
            materials_path: var("PEDLAB_MATERIALS_PATH")
                .unwrap_or_else(|| DEFAULT_MATERIALS_PATH.to_string()),
            messages_path: var("PEDLAB_MESSAGES_PATH")
                .unwrap_or_else(|| DEFAULT_MESSAGES_PATH.to_string()),
            upload_path: var("PEDLAB_UPLOAD_PATH")
                .unwrap_or_else(|| DEFAULT_UPLOAD_PATH.to_string()),
        };

        Ok(PedlabConfig {
            environment,
            storage_backend,
            s3_bucket: Some(var("S3_BUCKET").unwrap_or_else(|| DEFAULT_S3_BUCKET.to_string())),
            s3_region: Some(var("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string())),
            s3_endpoint: Some(
                var("S3_ENDPOINT").unwrap_or_else(|| DEFAULT_S3_ENDPOINT.to_string()),
            )
            .filter(|endpoint| !endpoint.is_empty()),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL"),
            max_document_size_bytes: max_document_size_mb * 1024 * 1024,
            remote,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_document_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_DOCUMENT_SIZE_MB must be greater than 0"));
        }

        match self.storage_backend {
            Some(StorageBackend::Local) if self.local_storage_path.is_none() => {
                return Err(anyhow::anyhow!(
                    "STORAGE_BACKEND=local requires LOCAL_STORAGE_PATH to be set"
                ));
            }
            Some(StorageBackend::S3) if self.s3_bucket.is_none() => {
                return Err(anyhow::anyhow!("STORAGE_BACKEND=s3 requires S3_BUCKET to be set"));
            }
            _ => {}
        }

        if !self.remote.api_url.starts_with("http://") && !self.remote.api_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "PEDLAB_API_URL must be an http(s) URL, got {}",
                self.remote.api_url
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<PedlabConfig, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PedlabConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_point_at_production_stores() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.storage_backend, None);
        assert_eq!(config.s3_bucket.as_deref(), Some("pedagogical-forum-files"));
        assert_eq!(config.s3_region.as_deref(), Some("ru-central1"));
        assert_eq!(
            config.s3_endpoint.as_deref(),
            Some("https://storage.yandexcloud.net")
        );
        assert_eq!(config.max_document_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.remote.upload_path, "/upload-to-s3");
        assert!(config.remote.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn local_backend_requires_path() {
        let config = config_from(&[("STORAGE_BACKEND", "local")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[
            ("STORAGE_BACKEND", "LOCAL"),
            ("LOCAL_STORAGE_PATH", "/tmp/pedlab"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("STORAGE_BACKEND", "ftp")]).is_err());
        assert!(config_from(&[("MAX_DOCUMENT_SIZE_MB", "lots")]).is_err());

        let config = config_from(&[("MAX_DOCUMENT_SIZE_MB", "0")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("PEDLAB_API_URL", "ftp://example")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn production_detection() {
        let config = Config(Box::new(config_from(&[("ENVIRONMENT", "Prod")]).unwrap()));
        assert!(config.is_production());
        assert_eq!(config.environment(), "Prod");
    }
}
