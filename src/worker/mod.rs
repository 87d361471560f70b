//! Background download worker pool
//!
//! Workers receive jobs from the broker's bounded channels and drive each
//! task through its state machine. The pool is fixed at startup; a worker
//! loop only exits when its channel closes (broker dropped at shutdown).

pub mod runner;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::fetcher::MediaFetcher;
use crate::observability::Metrics;
use crate::queue::DownloadJob;
use crate::store::TaskStore;

/// Spawn one worker task per receiver.
pub fn spawn_workers(
    receivers: Vec<mpsc::Receiver<DownloadJob>>,
    store: Arc<TaskStore>,
    fetcher: Arc<dyn MediaFetcher>,
    metrics: Arc<Metrics>,
) -> Vec<JoinHandle<()>> {
    receivers
        .into_iter()
        .enumerate()
        .map(|(worker_id, mut rx)| {
            let store = store.clone();
            let fetcher = fetcher.clone();
            let metrics = metrics.clone();

            tokio::spawn(async move {
                info!(worker_id, "Download worker started");
                while let Some(job) = rx.recv().await {
                    runner::process_job(job, &store, fetcher.as_ref(), &metrics).await;
                }
                info!(worker_id, "Download worker stopped");
            })
        })
        .collect()
}
