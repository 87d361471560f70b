//! Downloader/transcoder invocation
//!
//! The pipeline treats the actual fetching and transcoding as an external
//! collaborator behind the [`MediaFetcher`] trait. The production
//! implementation ([`YtDlpFetcher`]) shells out to yt-dlp and ffprobe;
//! tests substitute a mock.
//!
//! The contract separates two failure channels on purpose:
//! - a hard failure (`Err(FetchError)`) — the subprocess could not be
//!   launched or exited non-zero;
//! - an embedded soft error ([`FetchOutcome::error`]) — the call returned,
//!   but part of the work (e.g. metadata probing) did not succeed.
//!
//! The worker applies one uniform rule: inspect the returned outcome first;
//! any embedded error marks the task failed, otherwise the result fields are
//! recorded; only hard failures take the catch path.

mod ytdlp;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::api::models::TaskError;

pub use ytdlp::YtDlpFetcher;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to launch {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("downloader exited with an error: {0}")]
    CommandFailed(String),

    #[error("download produced no output file")]
    OutputMissing,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One download/transcode request.
///
/// `output_id` becomes the artifact's file stem, so the produced file is
/// always `{output_id}.{ext}` inside the media root.
#[derive(Debug, Clone, bon::Builder)]
pub struct FetchRequest {
    #[builder(into)]
    pub url: String,
    #[builder(into)]
    pub output_id: String,
    #[builder(default)]
    pub just_audio: bool,
    #[builder(default)]
    pub check_codec: bool,
}

/// Structured result of an invocation.
///
/// All fields are optional; `error`, when set, reports a soft failure even
/// though the call itself returned successfully. `raw` is an opaque copy of
/// whatever the collaborator printed, retained for diagnostics and never
/// interpreted elsewhere.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub file: Option<String>,
    pub name: Option<String>,
    pub is_h265: Option<bool>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub error: Option<TaskError>,
    pub raw: Option<Value>,
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchOutcome, FetchError>;
}
