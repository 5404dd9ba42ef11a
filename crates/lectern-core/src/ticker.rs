//! Periodic status refresh

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{CoreEvent, PresentationBook};

/// Handle to a running refresh loop.
///
/// The loop calls [`PresentationBook::refresh`] once per period and forwards
/// any resulting event. It stops on [`cancel`](Self::cancel), when the handle
/// is dropped, or when the event receiver goes away.
pub struct RefreshTicker {
    handle: Option<JoinHandle<()>>,
}

impl RefreshTicker {
    /// Spawn the refresh loop on the current tokio runtime.
    ///
    /// The first refresh happens one full `period` after start.
    pub fn start(
        book: Arc<Mutex<PresentationBook>>,
        period: Duration,
        events_tx: mpsc::UnboundedSender<CoreEvent>,
    ) -> Self {
        info!(period_secs = period.as_secs_f64(), "Starting refresh ticker");

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;

                let result = book.lock().await.refresh();
                match result {
                    Ok(Some(event)) => {
                        if events_tx.send(event).is_err() {
                            debug!("Refresh event receiver dropped, stopping ticker");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Periodic refresh failed"),
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Stop the loop. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Refresh ticker cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RefreshTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
