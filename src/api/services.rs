use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use tracing::{debug, error, warn};

use super::{
    models::{
        HealthResponse, MediaReplacedResponse, NewTask, OkResponse, PatchTaskRequest, TaskError,
        TaskListResponse, TaskPatch, TaskResponse, TaskStatus,
    },
    state::AppState,
    validation::{is_valid_media_name, is_valid_task_id},
};
use crate::api::error::ApiError;
use crate::media;
use crate::queue::DownloadJob;

/// Task submission endpoint (POST /tasks)
///
/// Accepts `{url, justAudio?, checkCodec?}`, persists a `pending` task and
/// hands a download job to the worker pool, then returns 202 with the task
/// document immediately. The client polls `GET /tasks/{id}` for progress.
///
/// Any payload without a usable `url` string is rejected with a structured
/// `INVALID_URL` error before a task record exists.
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    super::utils::require_json_content_type(content_type)
        .map_err(|_| ApiError::InvalidUrl("Request body must be JSON".to_string()))?;

    let body_bytes = read_body(body).await?;
    super::utils::validate_body_size(&body_bytes, state.config.server.max_json_bytes)?;

    // The creation contract predates typed request structs: `url` must be a
    // non-empty string, the two flags default to false whatever their shape.
    let payload: serde_json::Value = serde_json::from_slice(&body_bytes)
        .map_err(|_| ApiError::InvalidUrl("Invalid JSON body".to_string()))?;

    let url = payload
        .get("url")
        .and_then(|value| value.as_str())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::InvalidUrl("A valid URL is required".to_string()))?
        .to_string();

    let input = NewTask {
        url: url.clone(),
        just_audio: payload
            .get("justAudio")
            .and_then(|value| value.as_bool())
            .unwrap_or(false),
        check_codec: payload
            .get("checkCodec")
            .and_then(|value| value.as_bool())
            .unwrap_or(false),
    };

    let task = state
        .store
        .create(input)
        .map_err(|e| ApiError::Internal(format!("Failed to create task: {}", e)))?;

    let job = DownloadJob {
        task_id: task.id.clone(),
        url,
        just_audio: task.just_audio,
        check_codec: task.check_codec,
    };

    if let Err(e) = state.broker.dispatch(job).await {
        error!(task_id = %task.id, error = %e, "Failed to dispatch download job");

        // Never leave a task stuck at pending with no worker owning it
        let patch = TaskPatch {
            status: Some(TaskStatus::Error),
            error: Some(TaskError::new(
                "DOWNLOAD_FAILED",
                "Download workers unavailable",
            )),
            ..TaskPatch::default()
        };
        if let Err(e) = state.store.update(&task.id, patch) {
            error!(task_id = %task.id, error = %e, "Failed to mark undispatched task");
        }

        return Err(ApiError::Internal("Failed to queue download".to_string()));
    }

    state.metrics.task_accepted();

    Ok((StatusCode::ACCEPTED, Json(TaskResponse { task })))
}

/// Administrative listing endpoint (GET /tasks), newest first.
pub async fn list_tasks(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = state
        .store
        .list_all()
        .map_err(|e| ApiError::Internal(format!("Failed to list tasks: {}", e)))?;

    Ok(Json(TaskListResponse { tasks }))
}

/// Polling endpoint (GET /tasks/{id})
///
/// Malformed ids are rejected before touching the store.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_task_id(&task_id) {
        return Err(ApiError::InvalidId);
    }

    let task = state
        .store
        .get(&task_id)
        .map_err(|e| {
            error!(task_id = %task_id, error = %e, "Failed to fetch task");
            ApiError::Internal("Failed to fetch task".to_string())
        })?
        .ok_or(ApiError::TaskNotFound)?;

    Ok(Json(TaskResponse { task }))
}

/// Display-flag update endpoint (PATCH /tasks/{id})
///
/// Only `{hasBars: boolean}` is accepted. A missing task is a no-op 200:
/// the flag is auxiliary and the client has nothing useful to do with a 404.
pub async fn patch_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_task_id(&task_id) {
        return Err(ApiError::InvalidId);
    }

    let body_bytes = read_body(body).await?;
    let request: PatchTaskRequest = serde_json::from_slice(&body_bytes)
        .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    let patch = TaskPatch {
        has_bars: Some(request.has_bars),
        ..TaskPatch::default()
    };

    match state.store.update(&task_id, patch) {
        Ok(true) => {}
        Ok(false) => debug!(task_id = %task_id, "Patch against missing task ignored"),
        Err(e) => {
            error!(task_id = %task_id, error = %e, "Failed to update task");
            return Err(ApiError::Internal("Failed to update task".to_string()));
        }
    }

    Ok(Json(OkResponse { ok: true }))
}

/// Removal endpoint (DELETE /tasks/{id})
///
/// Unlinks the backing media file best-effort, then deletes the record.
/// A failed unlink never blocks record deletion.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_task_id(&task_id) {
        return Err(ApiError::InvalidId);
    }

    let task = state
        .store
        .get(&task_id)
        .map_err(|e| {
            error!(task_id = %task_id, error = %e, "Failed to fetch task");
            ApiError::Internal("Failed to fetch task".to_string())
        })?
        .ok_or(ApiError::TaskNotFound)?;

    if let Some(file) = &task.file {
        let path = media::resolve(&state.config.media.root, file);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!(task_id = %task_id, file = %file, error = %e, "Media file unlink failed");
        }
    }

    state.store.delete(&task_id).map_err(|e| {
        error!(task_id = %task_id, error = %e, "Failed to delete task");
        ApiError::Internal("Failed to delete task".to_string())
    })?;

    state.metrics.task_deleted();

    Ok(Json(OkResponse { ok: true }))
}

/// Artifact delivery endpoint (GET /media/{name})
///
/// Serves exactly one flat directory of pipeline-produced files. Names with
/// traversal material render as not-found, never forbidden, so the response
/// leaks nothing about the filesystem.
pub async fn serve_media(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_media_name(&name) {
        return Err(ApiError::MediaNotFound);
    }

    let path = media::resolve(&state.config.media.root, &name);

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|_| ApiError::MediaNotFound)?;
    if !metadata.is_file() {
        return Err(ApiError::MediaNotFound);
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        error!(file = %name, error = %e, "Failed to read media file");
        ApiError::Internal("Failed to read file".to_string())
    })?;

    state.metrics.file_served();

    let headers = [
        (
            header::CONTENT_TYPE,
            media::content_type_for(&name).to_string(),
        ),
        (
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.config.media.cache_max_age_secs),
        ),
    ];

    Ok((headers, bytes))
}

/// Artifact replacement endpoint (PUT /media/{name})
///
/// Lets a post-processing client (e.g. a crop pass) swap an artifact in
/// place. Only existing files may be replaced, and the owning task is
/// located through the file index so its `hasBars` flag is cleared.
pub async fn replace_media(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_media_name(&name) {
        return Err(ApiError::MediaNotFound);
    }

    let path = media::resolve(&state.config.media.root, &name);

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|_| ApiError::MediaNotFound)?;
    if !metadata.is_file() {
        return Err(ApiError::MediaNotFound);
    }

    let body_bytes = read_body(body).await?;
    super::utils::validate_body_size(&body_bytes, state.config.media.max_upload_bytes)?;
    if body_bytes.is_empty() {
        return Err(ApiError::InvalidPayload("empty upload body".to_string()));
    }

    tokio::fs::write(&path, &body_bytes).await.map_err(|e| {
        error!(file = %name, error = %e, "Failed to write media file");
        ApiError::Internal("Failed to write file".to_string())
    })?;

    let patch = TaskPatch {
        has_bars: Some(false),
        ..TaskPatch::default()
    };
    match state.store.update_by_file(&name, patch) {
        Ok(true) => {}
        Ok(false) => warn!(file = %name, "Replaced media file has no owning task"),
        Err(e) => {
            error!(file = %name, error = %e, "Failed to update task for replaced file");
            return Err(ApiError::Internal("Failed to update task".to_string()));
        }
    }

    Ok(Json(MediaReplacedResponse { ok: true, file: name }))
}

/// Health check endpoint (GET /health)
///
/// Reports per-component health (api, store, workers) and returns 503 if
/// any component is down.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    use std::collections::HashMap;

    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let store_status = match state.store.health_check() {
        Ok(()) => "healthy",
        Err(e) => {
            error!(error = %e, "Store health check failed");
            "unhealthy"
        }
    };
    components.insert("store".to_string(), store_status.to_string());

    let workers_status = if state.broker.health_check() {
        "healthy"
    } else {
        "unhealthy"
    };
    components.insert("workers".to_string(), workers_status.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

/// Reads a request body into memory.
async fn read_body(body: axum::body::Body) -> Result<Bytes, ApiError> {
    let data = body
        .collect()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .to_bytes();

    Ok(data)
}
