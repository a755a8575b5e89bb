//! Termination signal handling
//!
//! Lets the binary run the platform until SIGTERM/SIGINT and then shut the
//! modules down in order.

use tokio::signal;
use tracing::{info, warn};

/// Wait for SIGTERM or SIGINT (Ctrl+C elsewhere)
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        } else {
            info!("Received Ctrl+C, shutting down");
        }
    }
}
