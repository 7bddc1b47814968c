use thiserror::Error;

use crate::storage::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    /// Serve every upload from the in-memory store. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Process identity, reported in logs.
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket every locator of this instance points into
    pub bucket_name: String,
    pub chunk_size: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket_name: "resume-files".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let node_id = std::env::var("NODE_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let bucket_name =
            std::env::var("FILE_BUCKET_NAME").unwrap_or_else(|_| "resume-files".to_string());

        let chunk_size = match std::env::var("FILE_CHUNK_SIZE") {
            Ok(raw) => raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "FILE_CHUNK_SIZE must be a positive integer, got '{raw}'"
                ))
            })?,
            Err(_) => DEFAULT_CHUNK_SIZE,
        };

        let config = Config {
            node: NodeConfig {
                id: node_id,
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                bucket_name,
                chunk_size,
            },
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "NODE_ID cannot be empty".to_string(),
            ));
        }

        if self.storage.bucket_name.is_empty() || self.storage.bucket_name.contains('/') {
            return Err(ConfigError::ValidationError(
                "FILE_BUCKET_NAME must be non-empty and contain no '/'".to_string(),
            ));
        }

        if self.storage.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "FILE_CHUNK_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.test_mode {
            tracing::warn!("TEST_MODE is enabled; uploads are kept in memory only");
        }

        Ok(())
    }
}
