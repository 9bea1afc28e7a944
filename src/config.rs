//! Configuration management for the Cliquest file service
//!
//! Settings are read from `config.toml` with environment overrides
//! (`CLIQUEST_<SECTION>__<KEY>`). Every section has defaults so the service
//! can be constructed without any file on disk.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Complete service configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub limits: UploadLimits,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

/// Blob storage backend settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory that holds blobs for the filesystem backend
    pub blob_root: String,

    /// Prefix of every retrieval URL handed back to callers
    pub public_base_url: String,

    /// Bytes written between two progress reports
    pub upload_chunk_size: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            blob_root: "./blob_root".to_string(),
            public_base_url: "http://localhost:9199/cliquest".to_string(),
            upload_chunk_size: 64 * 1024,
        }
    }
}

impl StorageSettings {
    pub fn blob_root_path(&self) -> PathBuf {
        PathBuf::from(&self.blob_root)
    }
}

/// Client-side upload limits, checked before any network call
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadLimits {
    pub profile_image_max_mb: u64,
    pub cover_image_max_mb: u64,
    pub attachment_max_mb: u64,
    pub max_attachments_per_batch: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            profile_image_max_mb: 5,
            cover_image_max_mb: 10,
            attachment_max_mb: 5,
            max_attachments_per_batch: 10,
        }
    }
}

impl UploadLimits {
    pub fn profile_image_max_bytes(&self) -> u64 {
        self.profile_image_max_mb * BYTES_PER_MB
    }

    pub fn cover_image_max_bytes(&self) -> u64 {
        self.cover_image_max_mb * BYTES_PER_MB
    }

    pub fn attachment_max_bytes(&self) -> u64 {
        self.attachment_max_mb * BYTES_PER_MB
    }
}

/// Per-principal request throttling
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_requests: usize,
    pub window_secs: u64,
    /// Upper bound on distinct principals held in memory
    pub max_tracked_keys: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_secs: 60,
            max_tracked_keys: 10_000,
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl ServiceConfig {
    /// Load configuration from `config.toml` with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the given file stem; a missing file falls back to defaults
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix("CLIQUEST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServiceConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.storage.public_base_url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "storage.public_base_url cannot be empty".into(),
            ));
        }

        if self.storage.upload_chunk_size == 0 {
            return Err(config::ConfigError::Message(
                "storage.upload_chunk_size must be greater than 0".into(),
            ));
        }

        let limits = &self.limits;
        if limits.profile_image_max_mb == 0
            || limits.cover_image_max_mb == 0
            || limits.attachment_max_mb == 0
        {
            return Err(config::ConfigError::Message(
                "upload size limits must be greater than 0".into(),
            ));
        }

        if limits.max_attachments_per_batch == 0 {
            return Err(config::ConfigError::Message(
                "limits.max_attachments_per_batch must be greater than 0".into(),
            ));
        }

        let rate = &self.rate_limit;
        if rate.max_requests == 0 || rate.window_secs == 0 {
            return Err(config::ConfigError::Message(
                "rate_limit.max_requests and rate_limit.window_secs must be greater than 0".into(),
            ));
        }

        if rate.max_tracked_keys == 0 {
            return Err(config::ConfigError::Message(
                "rate_limit.max_tracked_keys must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}
