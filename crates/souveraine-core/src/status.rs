//! Background liveness polling

use std::sync::Arc;
use std::time::Duration;

use souveraine_api::Backend;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default delay between two liveness probes
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Polls `check_status` on a fixed interval and publishes the latest result.
///
/// The value is `None` until the first probe completes. Never touches
/// conversation state. The poll stops on [`StatusMonitor::stop`] or drop.
pub struct StatusMonitor {
    status_rx: watch::Receiver<Option<bool>>,
    cancel: CancellationToken,
}

impl StatusMonitor {
    /// Start polling `backend` every `interval`, probing once immediately
    pub fn spawn(backend: Arc<dyn Backend>, interval: Duration) -> Self {
        let (status_tx, status_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let online = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    online = backend.check_status() => online,
                };

                let previous = *status_tx.borrow();
                if previous != Some(online) {
                    if online {
                        tracing::info!("backend online");
                    } else {
                        tracing::warn!("backend offline");
                    }
                }
                status_tx.send_replace(Some(online));
            }
            tracing::debug!("status monitor stopped");
        });

        Self { status_rx, cancel }
    }

    /// Latest probe result, `None` before the first one
    pub fn status(&self) -> Option<bool> {
        *self.status_rx.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status() == Some(true)
    }

    /// Receiver notified on every probe
    pub fn subscribe(&self) -> watch::Receiver<Option<bool>> {
        self.status_rx.clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
