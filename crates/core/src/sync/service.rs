//! Contact sync poller
//!
//! Pulls contacts changed since the saved cursor in last-modified order,
//! caches them and moves the cursor to the newest change seen.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hubsync_domain::constants::{OBJECT_TYPE_CONTACTS, SYNC_BATCH_LIMIT};
use hubsync_domain::{Result, SyncCursor, SyncReport};
use tracing::{debug, info, instrument};

use super::ports::SyncCursorRepository;
use crate::search::ports::{ContactCacheRepository, ContactsApi};
use crate::tokens::TokenStore;
use crate::SharedRateLimiter;

/// Incremental contact sync driven by a per-portal cursor
pub struct ContactSyncPoller {
    cache: Arc<dyn ContactCacheRepository>,
    remote: Arc<dyn ContactsApi>,
    cursors: Arc<dyn SyncCursorRepository>,
    tokens: Arc<TokenStore>,
    limiter: SharedRateLimiter,
}

impl ContactSyncPoller {
    /// Create a new sync poller
    pub fn new(
        cache: Arc<dyn ContactCacheRepository>,
        remote: Arc<dyn ContactsApi>,
        cursors: Arc<dyn SyncCursorRepository>,
        tokens: Arc<TokenStore>,
        limiter: SharedRateLimiter,
    ) -> Self {
        Self { cache, remote, cursors, tokens, limiter }
    }

    /// Fetch one batch of contacts modified after `cursor`.
    ///
    /// # Errors
    /// Credential, provider and store errors are returned unchanged; the
    /// cursor is not moved when anything fails.
    #[instrument(skip(self))]
    pub async fn pull(
        &self,
        portal_id: &str,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<SyncReport> {
        self.limiter.take(portal_id, 1).await;
        let access_token = self.tokens.get_access_token(portal_id).await?;

        let mut batch = self
            .remote
            .contacts_modified_since(&access_token, portal_id, cursor, SYNC_BATCH_LIMIT)
            .await?;
        batch.sort_by_key(|record| record.updated_at);
        batch.truncate(SYNC_BATCH_LIMIT);

        let fetched = batch.len();
        let newest = batch.iter().map(|record| record.updated_at).max();
        let upserted = if batch.is_empty() { 0 } else { self.cache.upsert_many(batch).await? };

        let cursor_after = match newest {
            Some(hs_timestamp) => {
                let saved = self
                    .cursors
                    .advance(SyncCursor {
                        portal_id: portal_id.to_string(),
                        object_type: OBJECT_TYPE_CONTACTS.to_string(),
                        hs_timestamp,
                    })
                    .await?;
                Some(saved.hs_timestamp)
            }
            None => cursor,
        };

        let report = SyncReport {
            portal_id: portal_id.to_string(),
            fetched,
            upserted,
            cursor: cursor_after,
            has_more: fetched == SYNC_BATCH_LIMIT,
        };
        info!(fetched, upserted, has_more = report.has_more, "contact sync batch done");
        Ok(report)
    }

    /// [`ContactSyncPoller::pull`] starting from the saved cursor.
    pub async fn pull_from_saved_cursor(&self, portal_id: &str) -> Result<SyncReport> {
        let cursor = self
            .cursors
            .get(portal_id, OBJECT_TYPE_CONTACTS)
            .await?
            .map(|cursor| cursor.hs_timestamp);
        debug!(portal_id, ?cursor, "resuming contact sync");
        self.pull(portal_id, cursor).await
    }

    /// Portals with stored credentials, i.e. the ones worth polling.
    pub async fn connected_portals(&self) -> Result<Vec<String>> {
        self.tokens.connected_portals().await
    }
}
