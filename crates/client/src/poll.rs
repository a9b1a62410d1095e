//! Periodic admin stats refresh.
//!
//! The dashboard polls store statistics on a fixed interval. The poller must
//! be cancelled when the consuming view is torn down, so nothing updates
//! state after disposal; [`AppContext::teardown`](crate::context::AppContext::teardown)
//! does exactly that.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::admin::AdminService;
use crate::api::StatsSnapshot;

/// Handle to the background stats polling task.
pub struct StatsPoller {
    handle: JoinHandle<()>,
}

impl StatsPoller {
    /// Spawn a poller fetching stats every `interval`.
    ///
    /// Returns the poller handle and a watch receiver carrying the latest
    /// snapshot (`None` until the first successful fetch). Fetch failures
    /// are logged and the previous value stays in place.
    #[must_use]
    pub fn spawn(
        admin: AdminService,
        interval: Duration,
    ) -> (Self, watch::Receiver<Option<StatsSnapshot>>) {
        let (tx, rx) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; that gives the dashboard an
            // initial snapshot without waiting a full interval.
            loop {
                ticker.tick().await;
                match admin.stats().await {
                    Ok(snapshot) => {
                        tx.send_replace(Some(snapshot));
                    }
                    Err(e) => debug!(error = %e, "Stats poll failed"),
                }
            }
        });

        (Self { handle }, rx)
    }

    /// Stop polling. Nothing is published after this returns.
    pub fn cancel(&self) {
        self.handle.abort();
        info!("Stats poller cancelled");
    }

    /// Whether the polling task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        // Dropping the handle must not leave an orphan task updating state.
        self.handle.abort();
    }
}
