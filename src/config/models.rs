use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_fjall_path")]
    pub fjall_path: PathBuf,
    /// Maximum accepted JSON body size in bytes
    #[serde(default = "default_max_json_bytes")]
    pub max_json_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            fjall_path: default_fjall_path(),
            max_json_bytes: default_max_json_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_fjall_path() -> PathBuf {
    PathBuf::from("data/tasks")
}

fn default_max_json_bytes() -> usize {
    64 * 1024
}

/// Media delivery configuration
///
/// `root` is the only directory the media handler will ever read from or
/// write to. Production deployments point it at the container volume
/// (e.g. `/app/media`); the default suits local development.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
    /// Cache-Control max-age for served artifacts, in seconds
    #[serde(default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u64,
    /// Maximum accepted upload size for artifact replacement, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            cache_max_age_secs: default_cache_max_age_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_media_root() -> PathBuf {
    PathBuf::from("data/media")
}

fn default_cache_max_age_secs() -> u64 {
    3600
}

fn default_max_upload_bytes() -> usize {
    2 * 1024 * 1024 * 1024 // 2 GB
}

/// External downloader/transcoder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    #[serde(default = "default_ytdlp_binary")]
    pub ytdlp_binary: String,
    #[serde(default = "default_ffprobe_binary")]
    pub ffprobe_binary: String,
    /// Netscape-format cookies file for authenticated downloads.
    /// Loaded from the environment, never from the config file.
    #[serde(skip)]
    pub cookies: Option<PathBuf>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ytdlp_binary: default_ytdlp_binary(),
            ffprobe_binary: default_ffprobe_binary(),
            cookies: None,
        }
    }
}

fn default_ytdlp_binary() -> String {
    "yt-dlp".to_string()
}

fn default_ffprobe_binary() -> String {
    "ffprobe".to_string()
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkersConfig {
    #[serde(default = "default_worker_count")]
    pub count: usize,
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            channel_size: default_channel_size(),
        }
    }
}

fn default_worker_count() -> usize {
    2
}

fn default_channel_size() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.media.root, PathBuf::from("data/media"));
        assert_eq!(config.media.cache_max_age_secs, 3600);
        assert_eq!(config.fetcher.ytdlp_binary, "yt-dlp");
        assert_eq!(config.workers.count, 2);
    }
}
