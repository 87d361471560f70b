use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("workers.count must be at least 1")]
    NoWorkers,
    #[error("workers.channel_size must be at least 1")]
    EmptyChannel,
    #[error("media.root must not be empty")]
    EmptyMediaRoot,
    #[error("server.max_json_bytes must be at least 1024")]
    JsonLimitTooSmall,
}

pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if config.workers.count == 0 {
        return Err(ValidationError::NoWorkers);
    }

    if config.workers.channel_size == 0 {
        return Err(ValidationError::EmptyChannel);
    }

    if config.media.root.as_os_str().is_empty() {
        return Err(ValidationError::EmptyMediaRoot);
    }

    if config.server.max_json_bytes < 1024 {
        return Err(ValidationError::JsonLimitTooSmall);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_defaults() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_zero_workers() {
        let mut config = Config::default();
        config.workers.count = 0;

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::NoWorkers));
    }

    #[test]
    fn rejects_empty_media_root() {
        let mut config = Config::default();
        config.media.root = std::path::PathBuf::new();

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyMediaRoot));
    }
}
