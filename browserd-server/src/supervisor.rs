//! Signal-driven graceful shutdown (§4.J): close transports → close the
//! Session Registry → stop the virtual display → exit.

use std::sync::Arc;

use browserd_core::Registry;
use browserd_transport::Hub;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use crate::display::VirtualDisplay;

/// Waits for SIGINT or SIGTERM, then runs the shutdown sequence and returns
/// the process exit code (always 0 — startup failures exit before this
/// point with code 1, per §6).
pub async fn run_until_shutdown(
    registry: Arc<Registry>,
    hub: Arc<Hub>,
    server: JoinHandle<()>,
    display: Option<VirtualDisplay>,
) -> i32 {
    wait_for_signal().await;
    tracing::info!(target: "browserd_server::supervisor", "shutdown signal received");

    hub.close_all();
    tracing::info!(target: "browserd_server::supervisor", "transport connections closed");

    server.abort();
    let _ = server.await;
    tracing::info!(target: "browserd_server::supervisor", "http server stopped");

    registry.close().await;
    tracing::info!(target: "browserd_server::supervisor", "session registry closed");

    if let Some(mut display) = display {
        display.stop().await;
        tracing::info!(target: "browserd_server::supervisor", "virtual display stopped");
    }

    0
}

async fn wait_for_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}
