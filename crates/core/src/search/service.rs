//! Contact search service
//!
//! Serves from the local cache when it has enough hits, otherwise tops up
//! with a rate-limited remote search and warms the cache in the background.

use std::sync::Arc;

use hubsync_common::time::SharedClock;
use hubsync_domain::constants::{DEFAULT_MIN_LOCAL_RESULTS, MAX_SEARCH_LIMIT};
use hubsync_domain::{ContactRecord, HubSyncError, Result, SearchSource};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::merge::merge_contacts;
use super::ports::{ContactCacheRepository, ContactsApi};
use crate::tokens::TokenStore;
use crate::SharedRateLimiter;

/// Result of a search, with diagnostics the plain [`ContactSearchService::search`]
/// call drops.
#[derive(Debug)]
pub struct SearchOutcome {
    pub records: Vec<ContactRecord>,
    pub source: SearchSource,
    /// Why the remote leg was skipped or failed, if it was attempted.
    pub remote_error: Option<HubSyncError>,
    /// Background task caching newly observed remote records.
    pub backfill: Option<JoinHandle<()>>,
}

impl SearchOutcome {
    fn local(records: Vec<ContactRecord>) -> Self {
        Self { records, source: SearchSource::Local, remote_error: None, backfill: None }
    }
}

/// Cache-first contact search
pub struct ContactSearchService {
    cache: Arc<dyn ContactCacheRepository>,
    remote: Arc<dyn ContactsApi>,
    tokens: Arc<TokenStore>,
    limiter: SharedRateLimiter,
    clock: SharedClock,
    min_local_results: usize,
}

impl ContactSearchService {
    /// Create a new search service
    pub fn new(
        cache: Arc<dyn ContactCacheRepository>,
        remote: Arc<dyn ContactsApi>,
        tokens: Arc<TokenStore>,
        limiter: SharedRateLimiter,
        clock: SharedClock,
    ) -> Self {
        Self {
            cache,
            remote,
            tokens,
            limiter,
            clock,
            min_local_results: DEFAULT_MIN_LOCAL_RESULTS,
        }
    }

    /// Local hit count at which the remote call is skipped.
    #[must_use]
    pub fn with_min_local_results(mut self, threshold: usize) -> Self {
        self.min_local_results = threshold.max(1);
        self
    }

    /// Search contacts of `portal_id`. Remote failures degrade to local
    /// results.
    pub async fn search(
        &self,
        portal_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ContactRecord>> {
        Ok(self.search_detailed(portal_id, query, limit).await?.records)
    }

    /// Like [`ContactSearchService::search`] but reports where results came
    /// from and exposes the cache backfill task.
    ///
    /// # Errors
    /// Only local cache failures are returned. Remote and credential
    /// failures end up in [`SearchOutcome::remote_error`].
    #[instrument(skip(self))]
    pub async fn search_detailed(
        &self,
        portal_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::local(Vec::new()));
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        let mut local = self.cache.search(portal_id, query, limit).await?;
        local.truncate(limit);

        let threshold = self.min_local_results.min(limit);
        if local.len() >= threshold {
            debug!(hits = local.len(), "served from local cache");
            return Ok(SearchOutcome::local(local));
        }

        let remote = match self.fetch_remote(portal_id, query, limit).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(
                    error = %err,
                    local_hits = local.len(),
                    "remote contact search failed; returning local results"
                );
                let mut outcome = SearchOutcome::local(local);
                outcome.remote_error = Some(err);
                return Ok(outcome);
            }
        };

        let remote_hits = remote.len();
        let (records, newly_observed) = merge_contacts(local, remote, limit);
        debug!(remote_hits, merged = records.len(), new = newly_observed.len(), "merged search");

        let backfill = (!newly_observed.is_empty()).then(|| self.spawn_backfill(newly_observed));
        Ok(SearchOutcome { records, source: SearchSource::Merged, remote_error: None, backfill })
    }

    async fn fetch_remote(
        &self,
        portal_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ContactRecord>> {
        self.limiter.take(portal_id, 1).await;
        let access_token = self.tokens.get_access_token(portal_id).await?;
        self.remote
            .search_contacts(&access_token, portal_id, query, limit)
            .await
            .map_err(|err| match err {
                HubSyncError::Search(_) => err,
                other => HubSyncError::Search(other.to_string()),
            })
    }

    fn spawn_backfill(&self, records: Vec<ContactRecord>) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let now = self.clock.utc_now();
        let records: Vec<ContactRecord> =
            records.into_iter().map(|record| ContactRecord { updated_at: now, ..record }).collect();

        tokio::spawn(async move {
            let count = records.len();
            match cache.upsert_many(records).await {
                Ok(written) => debug!(count, written, "search results cached"),
                Err(err) => warn!(error = %err, count, "failed to cache search results"),
            }
        })
    }
}
