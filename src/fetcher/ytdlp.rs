//! yt-dlp subprocess fetcher
//!
//! Invocation details follow the deployment this service fronts: YouTube
//! URLs get explicit format selection so the merged output stays
//! web-playable, other platforms get a browser user agent, and an optional
//! Netscape cookies file covers authenticated downloads. Video downloads
//! are merged into mp4; audio-only downloads are extracted to m4a with
//! embedded metadata and cover art.

use std::path::PathBuf;

use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::api::models::TaskError;
use crate::config::FetcherConfig;

use super::{FetchError, FetchOutcome, FetchRequest, MediaFetcher};

/// How much subprocess stderr to keep in an error message.
const MAX_STDERR_CHARS: usize = 1024;

/// Titles longer than this are truncated, matching the artifact naming cap.
const MAX_TITLE_CHARS: usize = 128;

pub struct YtDlpFetcher {
    config: FetcherConfig,
    media_root: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(config: FetcherConfig, media_root: PathBuf) -> Self {
        Self { config, media_root }
    }

    fn download_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args = vec![request.url.clone()];

        if is_youtube(&request.url) {
            let format = if request.just_audio {
                "bestaudio[ext=m4a]/bestaudio"
            } else {
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio"
            };
            args.push("-f".to_string());
            args.push(format.to_string());
        } else {
            // Some platforms refuse the default yt-dlp user agent
            args.push("--add-header".to_string());
            args.push("user-agent:Mozilla/5.0".to_string());
        }

        if let Some(cookies) = &self.config.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }

        if request.just_audio {
            args.push("--extract-audio".to_string());
            args.push("--audio-format".to_string());
            args.push("m4a".to_string());
            args.push("--embed-metadata".to_string());
            args.push("--embed-thumbnail".to_string());
        } else {
            args.push("--merge-output-format".to_string());
            args.push("mp4".to_string());
        }

        args.push("-o".to_string());
        args.push(
            self.media_root
                .join(format!("{}.%(ext)s", request.output_id))
                .display()
                .to_string(),
        );

        args
    }

    fn metadata_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            url.to_string(),
            "--dump-json".to_string(),
            "--no-download".to_string(),
            "--no-warnings".to_string(),
        ];
        if let Some(cookies) = &self.config.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }
        args
    }

    async fn run_ytdlp(&self, args: &[String]) -> Result<Vec<u8>, FetchError> {
        let output = Command::new(&self.config.ytdlp_binary)
            .args(args)
            .output()
            .await
            .map_err(|source| FetchError::Launch {
                binary: self.config.ytdlp_binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let truncated: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(FetchError::CommandFailed(truncated));
        }

        Ok(output.stdout)
    }

    /// Locate the produced `{output_id}.{ext}` file in the media root.
    /// The extension is chosen by yt-dlp, so a directory scan is required.
    async fn find_output_file(&self, output_id: &str) -> Result<String, FetchError> {
        let prefix = format!("{}.", output_id);
        let mut entries = tokio::fs::read_dir(&self.media_root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with(&prefix) && entry.file_type().await?.is_file() {
                return Ok(file_name);
            }
        }

        Err(FetchError::OutputMissing)
    }

    /// Probe the produced file's video stream for H.265/HEVC.
    async fn probe_h265(&self, file_name: &str) -> Result<bool, FetchError> {
        let path = self.media_root.join(file_name);
        let output = Command::new(&self.config.ffprobe_binary)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_name",
                "-of",
                "json",
            ])
            .arg(&path)
            .output()
            .await
            .map_err(|source| FetchError::Launch {
                binary: self.config.ffprobe_binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let truncated: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(FetchError::CommandFailed(truncated));
        }

        let probe: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| FetchError::CommandFailed(format!("unparsable ffprobe output: {e}")))?;

        Ok(codec_is_h265(&probe))
    }
}

#[async_trait::async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchOutcome, FetchError> {
        info!(url = %request.url, output_id = %request.output_id, "Invoking yt-dlp");

        let args = self.download_args(&request);
        self.run_ytdlp(&args).await?;

        let file = self.find_output_file(&request.output_id).await?;
        debug!(file = %file, "Download produced artifact");

        let mut outcome = FetchOutcome {
            file: Some(file.clone()),
            ..FetchOutcome::default()
        };

        // Metadata probing is a separate invocation; its failure is a soft
        // error embedded in an otherwise successful outcome.
        match self.run_ytdlp(&self.metadata_args(&request.url)).await {
            Ok(stdout) => match serde_json::from_slice::<Value>(&stdout) {
                Ok(raw) => {
                    outcome.name = raw
                        .get("title")
                        .and_then(Value::as_str)
                        .map(sanitize_title);
                    outcome.thumbnail = raw
                        .get("thumbnail")
                        .and_then(Value::as_str)
                        .map(String::from);
                    outcome.duration = raw.get("duration").and_then(Value::as_f64);
                    outcome.uploader = raw
                        .get("uploader")
                        .and_then(Value::as_str)
                        .map(String::from);
                    outcome.raw = Some(raw);
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "Metadata output unparsable");
                    outcome.error = Some(TaskError::new(
                        "METADATA_FAILED",
                        format!("unparsable metadata output: {e}"),
                    ));
                }
            },
            Err(e) => {
                warn!(url = %request.url, error = %e, "Metadata probe failed");
                outcome.error =
                    Some(TaskError::new("METADATA_FAILED", e.to_string()));
            }
        }

        if request.check_codec && !request.just_audio {
            match self.probe_h265(&file).await {
                Ok(is_h265) => outcome.is_h265 = Some(is_h265),
                // Codec information stays unknown rather than failing the task
                Err(e) => warn!(file = %file, error = %e, "Codec probe failed"),
            }
        }

        Ok(outcome)
    }
}

fn is_youtube(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}

fn codec_is_h265(probe: &Value) -> bool {
    probe
        .get("streams")
        .and_then(Value::as_array)
        .and_then(|streams| streams.first())
        .and_then(|stream| stream.get("codec_name"))
        .and_then(Value::as_str)
        .map(|codec| codec.eq_ignore_ascii_case("hevc") || codec.eq_ignore_ascii_case("h265"))
        .unwrap_or(false)
}

/// Clean a remote title into something safe to show and store: drop URLs and
/// path-hostile characters, collapse whitespace, cap the length.
fn sanitize_title(raw: &str) -> String {
    let without_urls: Vec<&str> = raw
        .split_whitespace()
        .filter(|token| {
            !token.starts_with("http://")
                && !token.starts_with("https://")
                && !token.starts_with("ftp://")
        })
        .collect();

    let joined = without_urls.join(" ");
    let cleaned: String = joined
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '@' | '#' | '?' | '\n' | '\r'))
        .take(MAX_TITLE_CHARS)
        .collect();

    cleaned.trim().to_string()
}
