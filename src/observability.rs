//! Observability stubs (metrics, tracing)

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    tasks_accepted: AtomicU64,
    tasks_deleted: AtomicU64,
    downloads_completed: AtomicU64,
    downloads_failed: AtomicU64,
    files_served: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_accepted(&self) {
        self.tasks_accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_accepted", "Metric incremented");
    }

    pub fn task_deleted(&self) {
        self.tasks_deleted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_deleted", "Metric incremented");
    }

    pub fn download_completed(&self) {
        self.downloads_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "downloads_completed", "Metric incremented");
    }

    pub fn download_failed(&self) {
        self.downloads_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "downloads_failed", "Metric incremented");
    }

    pub fn file_served(&self) {
        self.files_served.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "files_served", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_accepted: self.tasks_accepted.load(Ordering::Relaxed),
            tasks_deleted: self.tasks_deleted.load(Ordering::Relaxed),
            downloads_completed: self.downloads_completed.load(Ordering::Relaxed),
            downloads_failed: self.downloads_failed.load(Ordering::Relaxed),
            files_served: self.files_served.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub tasks_accepted: u64,
    pub tasks_deleted: u64,
    pub downloads_completed: u64,
    pub downloads_failed: u64,
    pub files_served: u64,
}
