//! Termination signals.

use tracing::{info, warn};
use xds_sds::Lifecycle;

/// Resolve once SIGINT or SIGTERM is received.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to register SIGTERM handler, waiting for ctrl-c only");
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = ctrl_c() => {}
    }
}

/// Resolve once ctrl-c is received.
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received SIGINT"),
        Err(e) => {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}

/// Stop `lifecycle` on the first termination signal.
pub fn stop_on_signal(lifecycle: Lifecycle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => lifecycle.stop(),
            _ = lifecycle.stopped() => {}
        }
    })
}
