use std::sync::Arc;

use crate::config::Config;
use crate::observability::Metrics;
use crate::queue::DownloadBroker;
use crate::store::TaskStore;

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<TaskStore>,
    pub broker: Arc<DownloadBroker>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<TaskStore>,
        broker: Arc<DownloadBroker>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            broker,
            metrics,
        }
    }
}
