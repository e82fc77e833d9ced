//! Token store with buffered expiry and single-flight refresh

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use hubsync_common::time::SharedClock;
use hubsync_domain::constants::DEFAULT_REFRESH_BUFFER_SECS;
use hubsync_domain::{ConnectionStatus, HubSyncError, Result, TokenRecord};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::ports::TokenRepository;
use crate::oauth::ports::OAuthProvider;

/// Hands out valid access tokens per portal, refreshing when needed.
///
/// Refreshes for the same portal are serialized on a per-portal async mutex.
/// A caller that waited on the mutex re-reads the record and reuses a token
/// another caller just obtained, so N concurrent stale readers cause exactly
/// one provider call.
pub struct TokenStore {
    repository: Arc<dyn TokenRepository>,
    provider: Arc<dyn OAuthProvider>,
    clock: SharedClock,
    refresh_buffer: Duration,
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TokenStore {
    /// Create a new token store with the default refresh buffer
    pub fn new(
        repository: Arc<dyn TokenRepository>,
        provider: Arc<dyn OAuthProvider>,
        clock: SharedClock,
    ) -> Self {
        Self {
            repository,
            provider,
            clock,
            refresh_buffer: Duration::seconds(DEFAULT_REFRESH_BUFFER_SECS),
            refresh_locks: DashMap::new(),
        }
    }

    /// Tokens expiring within `buffer` are treated as stale.
    #[must_use]
    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    fn refresh_lock(&self, portal_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(&self.refresh_locks.entry(portal_id.to_string()).or_default())
    }

    async fn load(&self, portal_id: &str) -> Result<TokenRecord> {
        self.repository
            .get(portal_id)
            .await?
            .ok_or_else(|| HubSyncError::TokenFetch(format!("no credentials for portal {portal_id}")))
    }

    /// Return a usable access token, refreshing first if it is stale.
    ///
    /// # Errors
    /// - `TokenFetch` when the portal was never connected (or was disconnected)
    /// - `Refresh` when HubSpot rejected the refresh token; the record is gone
    /// - `ProviderUnavailable` when the token endpoint could not be reached
    #[instrument(skip(self))]
    pub async fn get_access_token(&self, portal_id: &str) -> Result<String> {
        let record = self.load(portal_id).await?;
        if record.is_fresh(self.clock.utc_now(), self.refresh_buffer) {
            return Ok(record.access_token);
        }

        debug!("access token stale; refreshing");
        let lock = self.refresh_lock(portal_id);
        let _guard = lock.lock().await;

        // Another caller may have refreshed while we waited.
        let record = self.load(portal_id).await?;
        if record.is_fresh(self.clock.utc_now(), self.refresh_buffer) {
            debug!("token refreshed by a concurrent caller");
            return Ok(record.access_token);
        }

        self.refresh_record(record).await
    }

    /// Exchange the stored refresh token unconditionally.
    ///
    /// # Errors
    /// Same as [`TokenStore::get_access_token`].
    #[instrument(skip(self))]
    pub async fn refresh(&self, portal_id: &str) -> Result<String> {
        let lock = self.refresh_lock(portal_id);
        let _guard = lock.lock().await;

        let record = self.load(portal_id).await?;
        self.refresh_record(record).await
    }

    async fn refresh_record(&self, mut record: TokenRecord) -> Result<String> {
        let Some(refresh_token) = record.refresh_token.clone() else {
            warn!(portal_id = %record.portal_id, "no refresh token stored; dropping credentials");
            self.repository.delete(&record.portal_id).await?;
            return Err(HubSyncError::Refresh("no refresh token stored".to_string()));
        };

        match self.provider.refresh(&refresh_token).await {
            Ok(grant) => {
                if let Err(err) = record.apply_refresh(grant, self.clock.utc_now()) {
                    warn!(portal_id = %record.portal_id, error = %err, "refresh grant unusable");
                    return Err(err);
                }
                let access_token = record.access_token.clone();
                let portal_id = record.portal_id.clone();
                let expires_at = record.expires_at;
                self.repository.upsert(record).await?;
                info!(%portal_id, %expires_at, "access token refreshed");
                Ok(access_token)
            }
            Err(HubSyncError::Refresh(reason)) => {
                warn!(
                    portal_id = %record.portal_id,
                    %reason,
                    "refresh token rejected; portal disconnected"
                );
                self.repository.delete(&record.portal_id).await?;
                Err(HubSyncError::Refresh(reason))
            }
            Err(err) => {
                warn!(portal_id = %record.portal_id, error = %err, "token refresh failed");
                Err(err)
            }
        }
    }

    /// Persist credentials obtained from a completed authorization.
    pub async fn save(&self, record: TokenRecord) -> Result<()> {
        let portal_id = record.portal_id.clone();
        self.repository.upsert(record).await?;
        info!(%portal_id, "credentials stored");
        Ok(())
    }

    /// Forget a portal's credentials immediately.
    #[instrument(skip(self))]
    pub async fn revoke(&self, portal_id: &str) -> Result<bool> {
        let removed = self.repository.delete(portal_id).await?;
        self.refresh_locks.remove(portal_id);
        if removed {
            info!("credentials revoked");
        }
        Ok(removed)
    }

    /// Connection state of `portal_id`
    pub async fn status(&self, portal_id: &str) -> Result<ConnectionStatus> {
        Ok(match self.repository.get(portal_id).await? {
            Some(_) => ConnectionStatus::Connected,
            None => ConnectionStatus::Disconnected,
        })
    }

    /// Portal connected by `user_id`, if any.
    pub async fn portal_for_user(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.repository.find_by_user(user_id).await?.map(|record| record.portal_id))
    }

    /// Every portal with stored credentials
    pub async fn connected_portals(&self) -> Result<Vec<String>> {
        self.repository.list_portals().await
    }
}
