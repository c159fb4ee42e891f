//! Shutdown signal - Ctrl-C from a terminal, SIGTERM from systemd

use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// Resolves once the process is asked to stop
pub async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            wait_for_interrupt().await;
            return;
        }
    };

    tokio::select! {
        _ = wait_for_interrupt() => {}
        _ = sigterm.recv() => info!("SIGTERM received"),
    }
}

async fn wait_for_interrupt() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
