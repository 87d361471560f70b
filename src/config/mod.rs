//! Configuration management for vidpipe
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `VIDPIPE__<section>__<key>`
//!
//! Examples:
//! - `VIDPIPE__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `VIDPIPE__MEDIA__ROOT=/app/media`
//! - `VIDPIPE__WORKERS__COUNT=4`
//!
//! The cookies file used for authenticated downloads is a secret and comes
//! only from the `YTDLP_COOKIES` environment variable.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/vidpipe.toml`.
//! This can be overridden using the `VIDPIPE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, FetcherConfig, MediaConfig, ServerConfig, WorkersConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`VIDPIPE__*`)
    /// 2. TOML file (default: `config/vidpipe.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:3001"

[fetcher]
ytdlp_binary = "/app/yt-dlp"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:3001");
        assert_eq!(config.fetcher.ytdlp_binary, "/app/yt-dlp");
    }

    #[test]
    fn test_validation_catches_zero_workers() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[workers]
count = 0
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::NoWorkers)
        ));
    }

    #[test]
    fn test_full_config_example() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "0.0.0.0:8080"
fjall_path = "data/tasks"
max_json_bytes = 65536

[media]
root = "/app/media"
cache_max_age_secs = 3600
max_upload_bytes = 1073741824

[fetcher]
ytdlp_binary = "/app/yt-dlp"
ffprobe_binary = "ffprobe"

[workers]
count = 4
channel_size = 128
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.media.max_upload_bytes, 1073741824);
        assert_eq!(config.workers.count, 4);
        assert_eq!(config.workers.channel_size, 128);
        // Cookies only ever come from the environment
        assert!(config.fetcher.cookies.is_none());
    }
}
