use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{
    services::{
        create_task, delete_task, get_task, health, list_tasks, patch_task, replace_media,
        serve_media,
    },
    state::AppState,
};
use crate::config::Config;
use crate::fetcher::YtDlpFetcher;
use crate::observability::Metrics;
use crate::queue::DownloadBroker;
use crate::store::TaskStore;
use crate::worker;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the service router. Shared with the integration tests, which wire
/// their own state around a mock fetcher.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/tasks", post(create_task).get(list_tasks))
        .route(
            "/tasks/{id}",
            get(get_task).patch(patch_task).delete(delete_task),
        )
        .route("/media/{name}", get(serve_media).put(replace_media))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// An explicit command-line address wins; otherwise the configured
/// `server.bind_addr` is used.
fn resolve_bind_addr(cli_address: Option<SocketAddr>, config: &Config) -> SocketAddr {
    cli_address.unwrap_or(config.server.bind_addr)
}

pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {}", e))?;
    let address = resolve_bind_addr(address, &config);

    info!(path = %config.server.fjall_path.display(), "Opening task store");
    let store = Arc::new(
        TaskStore::open(&config.server.fjall_path)
            .map_err(|e| format!("Failed to open task store: {}", e))?,
    );

    tokio::fs::create_dir_all(&config.media.root)
        .await
        .map_err(|e| format!("Failed to create media root: {}", e))?;

    let metrics = Arc::new(Metrics::new());
    let fetcher = Arc::new(YtDlpFetcher::new(
        config.fetcher.clone(),
        config.media.root.clone(),
    ));

    let (broker, receivers) =
        DownloadBroker::new(config.workers.count, config.workers.channel_size);
    let broker = Arc::new(broker);

    info!(workers = config.workers.count, "Spawning download workers");
    let _worker_handles =
        worker::spawn_workers(receivers, store.clone(), fetcher, metrics.clone());

    let state = AppState::new(config, store, broker, metrics);
    let app = build_router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "vidpipe API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
