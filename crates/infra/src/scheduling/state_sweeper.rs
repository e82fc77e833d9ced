//! Periodic removal of expired OAuth states
//!
//! Callback handling already rejects expired states; the sweeper only keeps
//! abandoned handshakes from piling up in the store.

use std::sync::Arc;
use std::time::Duration;

use hubsync_core::OAuthFlowManager;
use hubsync_domain::Result;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Background task dropping expired OAuth states
pub struct OAuthStateSweeper {
    flow: Arc<OAuthFlowManager>,
    interval: Duration,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl OAuthStateSweeper {
    /// Create a stopped sweeper
    pub fn new(flow: Arc<OAuthFlowManager>, interval: Duration) -> Self {
        Self {
            flow,
            interval,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the sweep loop.
    ///
    /// # Errors
    /// `AlreadyRunning` if a loop is active, `InvalidInterval` for a zero
    /// interval.
    #[instrument(skip(self), fields(interval_secs = self.interval.as_secs()))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running().await {
            return Err(SchedulerError::AlreadyRunning);
        }
        if self.interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }

        // Fresh token so the sweeper can be restarted after stop.
        self.cancellation_token = CancellationToken::new();

        let flow = Arc::clone(&self.flow);
        let interval = self.interval;
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move {
            Self::sweep_loop(flow, interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        info!("OAuth state sweeper started");
        Ok(())
    }

    /// Cancel the loop and wait for it to finish.
    ///
    /// # Errors
    /// `NotRunning` when there is nothing to stop, `Timeout` when the task
    /// does not finish within five seconds.
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

        info!("OAuth state sweeper stopped");
        Ok(())
    }

    /// Whether the background task is alive
    pub async fn is_running(&self) -> bool {
        let guard = self.task_handle.lock().await;
        guard.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Sweep once, now.
    pub async fn sweep_once(&self) -> Result<usize> {
        self.flow.sweep_expired().await
    }

    async fn sweep_loop(flow: Arc<OAuthFlowManager>, interval: Duration, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("state sweep loop cancelled");
                    break;
                }
                () = tokio::time::sleep(interval) => {
                    match flow.sweep_expired().await {
                        Ok(removed) => debug!(removed, "periodic state sweep completed"),
                        Err(e) => warn!(error = %e, "periodic state sweep failed"),
                    }
                }
            }
        }
    }
}
