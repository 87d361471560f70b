//! Per-job continuation: runs one download from `pending` to a terminal state

use tracing::{debug, error, info};

use crate::api::models::{TaskError, TaskPatch, TaskStatus};
use crate::fetcher::{FetchOutcome, FetchRequest, MediaFetcher};
use crate::observability::Metrics;
use crate::queue::DownloadJob;
use crate::store::TaskStore;

/// Process a single download job.
///
/// Writes are strictly ordered per task: the `downloading` write is awaited
/// before the invocation begins, and the terminal write happens only after
/// the invocation resolves. Every failure mode folds into the task's
/// terminal state; nothing propagates out of the worker loop.
pub async fn process_job(
    job: DownloadJob,
    store: &TaskStore,
    fetcher: &dyn MediaFetcher,
    metrics: &Metrics,
) {
    let task_id = job.task_id.clone();
    info!(task_id = %task_id, url = %job.url, "Processing download job");

    // pending -> downloading, persisted before the invocation so a poller
    // never sees a task stuck at pending while work is in flight
    match store.update(&task_id, TaskPatch::status(TaskStatus::Downloading)) {
        Ok(true) => {}
        Ok(false) => {
            // Task deleted between dispatch and pickup; nothing to do
            debug!(task_id = %task_id, "Task gone before download started, skipping");
            return;
        }
        Err(e) => {
            error!(task_id = %task_id, error = %e, "Failed to persist downloading state");
            return;
        }
    }

    let request = FetchRequest::builder()
        .url(job.url)
        .output_id(task_id.clone())
        .just_audio(job.just_audio)
        .check_codec(job.check_codec)
        .build();

    let terminal = match fetcher.fetch(request).await {
        Ok(outcome) => terminal_patch(outcome),
        // Hard failure: the invocation itself rejected
        Err(e) => TaskPatch {
            status: Some(TaskStatus::Error),
            error: Some(TaskError::new("DOWNLOAD_FAILED", e.to_string())),
            ..TaskPatch::default()
        },
    };

    let failed = matches!(terminal.status, Some(TaskStatus::Error));

    match store.update(&task_id, terminal) {
        Ok(true) => {
            if failed {
                metrics.download_failed();
                info!(task_id = %task_id, "Download finished with error");
            } else {
                metrics.download_completed();
                info!(task_id = %task_id, "Download finished");
            }
        }
        Ok(false) => {
            // Deleted while downloading; tolerated, never recreated
            debug!(task_id = %task_id, "Task deleted mid-download, terminal write skipped");
        }
        Err(e) => {
            // No retry policy for terminal-write storage faults; the task
            // stays at `downloading` and the fault is only visible here
            error!(task_id = %task_id, error = %e, "Failed to persist terminal state");
        }
    }
}

/// Fold an invocation outcome into the terminal patch.
///
/// An embedded error wins: the task fails with exactly that error and the
/// result fields stay as they were before the failure. Otherwise the task
/// completes with the extracted result fields, keeping the raw collaborator
/// output for diagnostics in both cases.
fn terminal_patch(outcome: FetchOutcome) -> TaskPatch {
    if let Some(error) = outcome.error {
        return TaskPatch {
            status: Some(TaskStatus::Error),
            error: Some(error),
            raw: outcome.raw,
            ..TaskPatch::default()
        };
    }

    TaskPatch {
        status: Some(TaskStatus::Done),
        file: outcome.file,
        name: outcome.name,
        is_h265: outcome.is_h265,
        thumbnail: outcome.thumbnail,
        duration: outcome.duration,
        uploader: outcome.uploader,
        raw: outcome.raw,
        ..TaskPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::NewTask;
    use crate::fetcher::FetchError;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    struct StubFetcher {
        result: Result<FetchOutcome, &'static str>,
    }

    #[async_trait]
    impl MediaFetcher for StubFetcher {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchOutcome, FetchError> {
            match &self.result {
                Ok(outcome) => {
                    let mut outcome = outcome.clone();
                    if outcome.file.is_some() {
                        outcome.file = Some(format!("{}.mp4", request.output_id));
                    }
                    Ok(outcome)
                }
                Err(message) => Err(FetchError::CommandFailed(message.to_string())),
            }
        }
    }

    fn setup() -> (TaskStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = TaskStore::open(temp_dir.path().join("tasks")).unwrap();
        (store, temp_dir)
    }

    fn job_for(store: &TaskStore) -> DownloadJob {
        let task = store
            .create(NewTask {
                url: "https://example.com/v".to_string(),
                just_audio: false,
                check_codec: false,
            })
            .unwrap();
        DownloadJob {
            task_id: task.id,
            url: "https://example.com/v".to_string(),
            just_audio: false,
            check_codec: false,
        }
    }

    #[tokio::test]
    async fn successful_outcome_reaches_done_with_result_fields() {
        let (store, _temp) = setup();
        let job = job_for(&store);
        let task_id = job.task_id.clone();

        let fetcher = StubFetcher {
            result: Ok(FetchOutcome {
                file: Some("placeholder".to_string()),
                name: Some("A title".to_string()),
                is_h265: Some(false),
                duration: Some(42.5),
                uploader: Some("channel".to_string()),
                raw: Some(json!({"title": "A title"})),
                ..FetchOutcome::default()
            }),
        };

        process_job(job, &store, &fetcher, &Metrics::new()).await;

        let task = store.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.file.as_deref(), Some(format!("{}.mp4", task_id).as_str()));
        assert_eq!(task.name.as_deref(), Some("A title"));
        assert_eq!(task.duration, Some(42.5));
        assert!(task.error.is_none());
        assert!(task.raw.is_some());
    }

    #[tokio::test]
    async fn embedded_error_reaches_error_without_result_fields() {
        let (store, _temp) = setup();
        let job = job_for(&store);
        let task_id = job.task_id.clone();

        let fetcher = StubFetcher {
            result: Ok(FetchOutcome {
                error: Some(TaskError::new("METADATA_FAILED", "probe failed")),
                ..FetchOutcome::default()
            }),
        };

        process_job(job, &store, &fetcher, &Metrics::new()).await;

        let task = store.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.error.as_ref().unwrap().code, "METADATA_FAILED");
        assert!(task.file.is_none());
        assert!(task.name.is_none());
    }

    #[tokio::test]
    async fn hard_failure_becomes_download_failed() {
        let (store, _temp) = setup();
        let job = job_for(&store);
        let task_id = job.task_id.clone();

        let fetcher = StubFetcher {
            result: Err("yt-dlp exited with code 1"),
        };

        process_job(job, &store, &fetcher, &Metrics::new()).await;

        let task = store.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Error);
        let error = task.error.unwrap();
        assert_eq!(error.code, "DOWNLOAD_FAILED");
        assert!(error.message.contains("yt-dlp exited with code 1"));
    }

    #[tokio::test]
    async fn deleted_task_is_tolerated() {
        let (store, _temp) = setup();
        let job = job_for(&store);
        let task_id = job.task_id.clone();

        store.delete(&task_id).unwrap();

        let fetcher = StubFetcher {
            result: Ok(FetchOutcome::default()),
        };

        // Must not panic, and must not recreate the record
        process_job(job, &store, &fetcher, &Metrics::new()).await;
        assert!(store.get(&task_id).unwrap().is_none());
    }
}
