//! Scripted HubSpot fakes with call counters

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_core::{ContactsApi, OAuthProvider};
use hubsync_domain::{ContactRecord, HubSyncError, Result as DomainResult, TokenGrant, TokenInfo};
use parking_lot::Mutex;

pub struct FakeOAuthProvider {
    hub_id: u64,
    refresh_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    refresh_result: Mutex<DomainResult<TokenGrant>>,
    exchange_result: Mutex<DomainResult<TokenGrant>>,
    delay: Mutex<StdDuration>,
}

pub fn grant(access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> TokenGrant {
    TokenGrant {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_in,
        scope: BTreeSet::new(),
    }
}

impl FakeOAuthProvider {
    pub fn new(hub_id: u64) -> Self {
        Self {
            hub_id,
            refresh_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            refresh_result: Mutex::new(Ok(grant("access-2", Some("refresh-2"), 1800))),
            exchange_result: Mutex::new(Ok(grant("access-new", Some("refresh-new"), 1800))),
            delay: Mutex::new(StdDuration::ZERO),
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn set_refresh_result(&self, result: DomainResult<TokenGrant>) {
        *self.refresh_result.lock() = result;
    }

    pub fn set_exchange_result(&self, result: DomainResult<TokenGrant>) {
        *self.exchange_result.lock() = result;
    }

    /// Real-time delay applied to refresh calls, to widen race windows.
    pub fn set_delay(&self, delay: StdDuration) {
        *self.delay.lock() = delay;
    }
}

#[async_trait]
impl OAuthProvider for FakeOAuthProvider {
    async fn exchange_code(&self, _code: &str) -> DomainResult<TokenGrant> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange_result.lock().clone()
    }

    async fn refresh(&self, _refresh_token: &str) -> DomainResult<TokenGrant> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.refresh_result.lock().clone()
    }

    async fn token_info(&self, _access_token: &str) -> DomainResult<TokenInfo> {
        Ok(TokenInfo {
            hub_id: self.hub_id,
            user: Some("owner@example.com".to_string()),
            scopes: vec!["crm.objects.contacts.read".to_string(), "oauth".to_string()],
        })
    }
}

#[derive(Default)]
pub struct FakeContactsApi {
    search_calls: AtomicUsize,
    sync_calls: AtomicUsize,
    search_results: Mutex<Vec<ContactRecord>>,
    search_error: Mutex<Option<HubSyncError>>,
    modified: Mutex<Vec<ContactRecord>>,
    last_since: Mutex<Option<DateTime<Utc>>>,
    last_token: Mutex<Option<String>>,
}

impl FakeContactsApi {
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    pub fn set_search_results(&self, records: Vec<ContactRecord>) {
        *self.search_results.lock() = records;
    }

    pub fn fail_search(&self, error: HubSyncError) {
        *self.search_error.lock() = Some(error);
    }

    /// Contacts served by the modified-since endpoint.
    pub fn set_modified(&self, records: Vec<ContactRecord>) {
        *self.modified.lock() = records;
    }

    pub fn last_since(&self) -> Option<DateTime<Utc>> {
        *self.last_since.lock()
    }

    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().clone()
    }
}

#[async_trait]
impl ContactsApi for FakeContactsApi {
    async fn search_contacts(
        &self,
        access_token: &str,
        _portal_id: &str,
        _query: &str,
        limit: usize,
    ) -> DomainResult<Vec<ContactRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock() = Some(access_token.to_string());
        if let Some(err) = self.search_error.lock().clone() {
            return Err(err);
        }
        Ok(self.search_results.lock().iter().take(limit).cloned().collect())
    }

    async fn contacts_modified_since(
        &self,
        access_token: &str,
        _portal_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> DomainResult<Vec<ContactRecord>> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_since.lock() = since;
        *self.last_token.lock() = Some(access_token.to_string());
        let mut records: Vec<ContactRecord> = self
            .modified
            .lock()
            .iter()
            .filter(|record| since.map_or(true, |since| record.updated_at > since))
            .cloned()
            .collect();
        records.sort_by_key(|record| record.updated_at);
        records.truncate(limit);
        // Hand the page back newest-first to exercise the poller's ordering.
        records.reverse();
        Ok(records)
    }
}
