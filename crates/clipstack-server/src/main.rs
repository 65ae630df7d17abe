mod monitor;
mod server;
mod watcher;

use anyhow::Result;
use clipstack_common::ipc::create_server;
use clipstack_config::Config;
use clipstack_platform::SystemClipboard;
use clipstack_store::HistoryStore;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::monitor::MonitorLoop;
use crate::server::{Server, ServerState};
use crate::watcher::ClipboardWatcher;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("clipstack-server starting...");

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default_config()
    });
    let options = &config.options;
    let store = HistoryStore::new(options.history_file(), options.max_history);

    let socket = clipstack_common::socket_path();
    let listener = create_server(&socket).await?;
    info!("Listening on: {}", socket.display());

    let (stop_tx, stop_rx) = watch::channel(false);

    let monitor = MonitorLoop::new(
        ClipboardWatcher::new(SystemClipboard::new()),
        store.clone(),
        options.poll_interval(),
        options.backoff_interval(),
        stop_rx,
    );
    let monitor_task = tokio::spawn(monitor.run());

    let signal_tx = stop_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Stopping clipstack-server...");
        let _ = signal_tx.send(true);
    });

    let server = Server::new(
        ServerState::new(store, Box::new(SystemClipboard::new())),
        stop_tx,
    );
    let served = server.run(listener).await;

    if let Err(e) = monitor_task.await {
        warn!("Monitor task failed: {}", e);
    }
    if let Err(e) = std::fs::remove_file(&socket) {
        warn!("Failed to remove socket {}: {}", socket.display(), e);
    }

    info!("clipstack-server shutting down.");
    served
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
