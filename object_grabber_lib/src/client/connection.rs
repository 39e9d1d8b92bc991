use tokio::sync::watch;
use tracing::{debug, info};

use crate::{ConnectionConfig, GoalTransport, GrabberError, Result};

/// Waits for the action service to become reachable.
///
/// There is no retry limit: the service is the only thing this client talks
/// to, and it may come up in any order relative to us. The wait ends on the
/// first successful probe or when shutdown is requested.
pub struct ConnectionManager {
    config: ConnectionConfig,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Probe until the service answers. Returns the number of probes issued.
    pub async fn ensure_connected<T>(
        &self,
        transport: &T,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<u32>
    where
        T: GoalTransport + ?Sized,
    {
        info!("waiting for server: ");
        let mut attempts: u32 = 0;
        let mut shutdown_open = true;

        loop {
            if *shutdown.borrow() {
                return Err(GrabberError::Shutdown("waiting for server".to_string()));
            }

            attempts += 1;
            let available = tokio::select! {
                available = transport.probe(self.config.probe_timeout()) => available,
                _ = wait_for_shutdown(shutdown, shutdown_open) => {
                    return Err(GrabberError::Shutdown("waiting for server".to_string()));
                }
            };

            if available {
                info!("connected to object grabber action server after {} probe(s)", attempts);
                return Ok(attempts);
            }

            info!("retrying...");
            let retry = tokio::time::sleep(self.config.retry_interval());
            tokio::pin!(retry);

            loop {
                tokio::select! {
                    _ = &mut retry => break,
                    changed = shutdown.changed(), if shutdown_open => {
                        if changed.is_err() {
                            debug!("shutdown channel closed while waiting for server");
                            shutdown_open = false;
                        } else if *shutdown.borrow() {
                            return Err(GrabberError::Shutdown("waiting for server".to_string()));
                        }
                    }
                }
            }
        }
    }
}

/// Resolves once shutdown is requested; never if the channel is already closed.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>, open: bool) {
    if open {
        // wait_for returns Err only when the sender is gone
        if shutdown.wait_for(|stop| *stop).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}
