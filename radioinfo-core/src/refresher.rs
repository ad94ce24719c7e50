//! Periodic background refresh of cached schedules.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::controller::RefreshController;

/// Default interval between bulk refreshes (one hour)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Background task that calls [`RefreshController::update_cached_schedules`] on a fixed interval
pub struct ScheduleRefresher {
    controller: Arc<RefreshController>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl ScheduleRefresher {
    /// Create a new schedule refresher
    ///
    /// # Arguments
    /// * `controller` - Controller whose cached schedules are refreshed
    /// * `interval` - Time between refreshes; the first one runs after one interval
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    pub fn new(
        controller: Arc<RefreshController>,
        interval: Duration,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            controller,
            interval,
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start refreshing in a background task
    #[must_use]
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the refresh loop until cancelled
    async fn run(&self) {
        info!(
            "Starting schedule refresher (every {} seconds)",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Schedule refresher shutting down");
                    break;
                }
                () = tokio::time::sleep(self.interval) => {
                    if let Err(e) = self.controller.update_cached_schedules().await {
                        warn!("Scheduled refresh failed: {}", e);
                    }
                }
            }
        }
    }
}
