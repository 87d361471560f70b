use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Unit of background work handed from the HTTP layer to the worker pool.
///
/// The durable `pending` task record already exists by the time a job is
/// dispatched, so the job itself only carries what the worker needs to run
/// the invocation.
#[derive(Clone, Debug)]
pub struct DownloadJob {
    pub task_id: String,
    pub url: String,
    pub just_audio: bool,
    pub check_codec: bool,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no worker available to accept the job")]
    WorkersUnavailable,
}

/// DownloadBroker distributes jobs from the API to the worker pool
///
/// Architecture:
/// 1. API calls `broker.dispatch(job)` after persisting the pending task
/// 2. Round-robin distribution across worker channels
/// 3. Backpressure via bounded channels
///
/// The broker is not a separate tokio task - it's just a struct with methods
/// called by API handlers. Distribution is synchronous via mpsc::send().
pub struct DownloadBroker {
    worker_channels: Vec<mpsc::Sender<DownloadJob>>,
    next_worker: AtomicUsize,
}

impl DownloadBroker {
    /// Create a new broker with one bounded channel per worker.
    ///
    /// Returns:
    /// - the broker (to be shared with the API via Arc)
    /// - one receiver per worker, for spawning the pool
    pub fn new(
        num_workers: usize,
        channel_size: usize,
    ) -> (Self, Vec<mpsc::Receiver<DownloadJob>>) {
        info!(num_workers, channel_size, "Creating download broker");

        let mut worker_channels = Vec::with_capacity(num_workers);
        let mut worker_receivers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = mpsc::channel(channel_size);
            worker_channels.push(tx);
            worker_receivers.push(rx);
            debug!(worker_id, "Created worker channel");
        }

        let broker = Self {
            worker_channels,
            next_worker: AtomicUsize::new(0),
        };

        (broker, worker_receivers)
    }

    /// Dispatch a job to the next worker (round-robin).
    ///
    /// Awaiting the bounded send applies backpressure when the chosen
    /// worker's queue is full. A closed channel means the pool is gone;
    /// the caller decides how to fail the task.
    pub async fn dispatch(&self, job: DownloadJob) -> Result<(), DispatchError> {
        let worker_idx =
            self.next_worker.fetch_add(1, Ordering::Relaxed) % self.worker_channels.len();

        match self.worker_channels[worker_idx].send(job).await {
            Ok(()) => {
                debug!(worker_idx, "Job dispatched to worker");
                Ok(())
            }
            Err(_) => Err(DispatchError::WorkersUnavailable),
        }
    }

    /// Number of workers behind this broker
    pub fn num_workers(&self) -> usize {
        self.worker_channels.len()
    }

    /// Check if all worker channels are healthy (not closed)
    pub fn health_check(&self) -> bool {
        self.worker_channels.iter().all(|ch| !ch.is_closed())
    }
}
