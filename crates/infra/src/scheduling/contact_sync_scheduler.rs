//! Interval-driven incremental contact sync
//!
//! Each tick pulls every connected portal from its saved cursor, following
//! full batches until the portal is caught up or `max_pages` is reached.

use std::sync::Arc;
use std::time::Duration;

use hubsync_core::ContactSyncPoller;
use hubsync_domain::{HubSyncError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ContactSyncSchedulerConfig {
    pub interval: Duration,
    /// Batches pulled per portal per tick.
    pub max_pages: usize,
    /// Budget for one portal's pulls.
    pub portal_timeout: Duration,
}

impl Default for ContactSyncSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            max_pages: 10,
            portal_timeout: Duration::from_secs(60),
        }
    }
}

/// Outcome of one pass over all portals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRunSummary {
    pub portals: usize,
    pub failed: usize,
    pub upserted: usize,
}

/// Background task running periodic contact sync passes
pub struct ContactSyncScheduler {
    poller: Arc<ContactSyncPoller>,
    config: ContactSyncSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl ContactSyncScheduler {
    /// Create a stopped scheduler
    pub fn new(poller: Arc<ContactSyncPoller>, config: ContactSyncSchedulerConfig) -> Self {
        Self {
            poller,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    #[instrument(skip(self), fields(interval_secs = self.config.interval.as_secs()))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running().await {
            return Err(SchedulerError::AlreadyRunning);
        }
        if self.config.interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }

        self.cancellation_token = CancellationToken::new();

        let poller = Arc::clone(&self.poller);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move {
            Self::sync_loop(poller, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        info!("contact sync scheduler started");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running().await {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            match tokio::time::timeout(STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(SchedulerError::TaskJoinFailed(e.to_string())),
                Err(_) => return Err(SchedulerError::Timeout { seconds: STOP_TIMEOUT.as_secs() }),
            }
        }

        info!("contact sync scheduler stopped");
        Ok(())
    }

    /// Whether the background task is alive
    pub async fn is_running(&self) -> bool {
        let guard = self.task_handle.lock().await;
        guard.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// One pass over every connected portal. A failing portal is logged and
    /// does not stop the others.
    pub async fn run_once(&self) -> Result<SyncRunSummary> {
        Self::run_pass(&self.poller, &self.config).await
    }

    async fn run_pass(
        poller: &ContactSyncPoller,
        config: &ContactSyncSchedulerConfig,
    ) -> Result<SyncRunSummary> {
        let portals = poller.connected_portals().await?;
        let mut summary = SyncRunSummary { portals: portals.len(), ..SyncRunSummary::default() };

        for portal_id in portals {
            let pulls = Self::sync_portal(poller, &portal_id, config.max_pages);
            let outcome = tokio::time::timeout(config.portal_timeout, pulls).await.unwrap_or_else(|_| {
                Err(HubSyncError::ProviderUnavailable(format!(
                    "sync exceeded {}s",
                    config.portal_timeout.as_secs()
                )))
            });

            match outcome {
                Ok(upserted) => summary.upserted += upserted,
                Err(e) => {
                    warn!(portal_id = %portal_id, error = %e, kind = e.label(), "portal sync failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn sync_portal(
        poller: &ContactSyncPoller,
        portal_id: &str,
        max_pages: usize,
    ) -> Result<usize> {
        let mut upserted = 0;
        for _ in 0..max_pages.max(1) {
            let report = poller.pull_from_saved_cursor(portal_id).await?;
            upserted += report.upserted;
            if !report.has_more {
                break;
            }
        }
        Ok(upserted)
    }

    async fn sync_loop(
        poller: Arc<ContactSyncPoller>,
        config: ContactSyncSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("contact sync loop cancelled");
                    break;
                }
                () = tokio::time::sleep(config.interval) => {
                    // A pass can park on the rate limiter for a full window.
                    let outcome = tokio::select! {
                        () = cancel.cancelled() => {
                            debug!("contact sync pass abandoned on shutdown");
                            break;
                        }
                        outcome = Self::run_pass(&poller, &config) => outcome,
                    };
                    match outcome {
                        Ok(summary) => debug!(
                            portals = summary.portals,
                            failed = summary.failed,
                            upserted = summary.upserted,
                            "periodic contact sync completed"
                        ),
                        Err(e) => warn!(error = %e, "periodic contact sync failed"),
                    }
                }
            }
        }
    }
}
