//! API models for vidpipe task and media endpoints.
//!
//! This module defines the wire-format data structures of the service:
//! - Clients submit downloads via `POST /tasks` with a [`CreateTaskRequest`]
//! - Every endpoint that returns a task returns the full [`Task`] document
//! - Status polling relies on the monotonic [`TaskStatus`] progression
//!
//! # Task document
//!
//! A completed task as JSON:
//!
//! ```json
//! {
//!   "id": "3f8a21c09b7d4e65a1f02c88",
//!   "url": "https://example.com/watch?v=abc",
//!   "justAudio": false,
//!   "checkCodec": true,
//!   "status": "done",
//!   "file": "3f8a21c09b7d4e65a1f02c88.mp4",
//!   "name": "Some video title",
//!   "isH265": false,
//!   "thumbnail": "https://cdn.example.com/thumb.jpg",
//!   "duration": 213.4,
//!   "uploader": "Some channel",
//!   "hasBars": null,
//!   "error": null,
//!   "raw": { "...": "opaque yt-dlp document" },
//!   "createdAt": "2026-08-29T12:00:00Z",
//!   "updatedAt": "2026-08-29T12:01:42Z"
//! }
//! ```
//!
//! Result fields (`file`, `name`, `isH265`, `thumbnail`, `duration`,
//! `uploader`) are null until the task transitions to `done`. `error` is
//! populated only on the `error` transition; the two never coexist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Lifecycle state of a download task.
///
/// Transitions are strictly `pending -> downloading -> {done | error}`;
/// terminal states never change again.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Downloading,
    Done,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }
}

/// Machine-readable error recorded on a failed task.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TaskError {
    pub code: String,
    pub message: String,
}

impl TaskError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The central task document, persisted by the store.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub url: String,
    pub just_audio: bool,
    pub check_codec: bool,
    pub status: TaskStatus,
    pub file: Option<String>,
    pub name: Option<String>,
    pub is_h265: Option<bool>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub has_bars: Option<bool>,
    pub error: Option<TaskError>,
    /// Opaque copy of the downloader's raw output, kept for diagnostics.
    pub raw: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Merge a partial update into this task. `updated_at` is bumped by the
    /// store, not here.
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(file) = patch.file {
            self.file = Some(file);
        }
        if let Some(name) = patch.name {
            self.name = Some(name);
        }
        if let Some(is_h265) = patch.is_h265 {
            self.is_h265 = Some(is_h265);
        }
        if let Some(thumbnail) = patch.thumbnail {
            self.thumbnail = Some(thumbnail);
        }
        if let Some(duration) = patch.duration {
            self.duration = Some(duration);
        }
        if let Some(uploader) = patch.uploader {
            self.uploader = Some(uploader);
        }
        if let Some(has_bars) = patch.has_bars {
            self.has_bars = Some(has_bars);
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        if let Some(raw) = patch.raw {
            self.raw = Some(raw);
        }
    }
}

/// Partial update applied by [`Task::apply`]. Only `Some` fields are merged.
#[derive(Debug, Default, Clone)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub file: Option<String>,
    pub name: Option<String>,
    pub is_h265: Option<bool>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub has_bars: Option<bool>,
    pub error: Option<TaskError>,
    pub raw: Option<Value>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Immutable input fields captured at creation time.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub url: String,
    pub just_audio: bool,
    pub check_codec: bool,
}

/// Body of `POST /tasks`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub url: String,
    #[serde(default)]
    pub just_audio: bool,
    #[serde(default)]
    pub check_codec: bool,
}

/// Body of `PATCH /tasks/{id}` — the single auxiliary display flag.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PatchTaskRequest {
    pub has_bars: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskResponse {
    pub task: Task,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaReplacedResponse {
    pub ok: bool,
    pub file: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
