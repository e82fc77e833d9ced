//! Contact cache and CRM API ports

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_domain::{ContactRecord, Result};

/// Local contact cache with full-text lookup.
#[async_trait]
pub trait ContactCacheRepository: Send + Sync {
    /// Up to `limit` cached contacts of `portal_id` matching `query`.
    async fn search(&self, portal_id: &str, query: &str, limit: usize)
        -> Result<Vec<ContactRecord>>;

    /// Upsert under last-write-wins on `updated_at`. Returns how many rows
    /// were written (older records are skipped).
    async fn upsert_many(&self, records: Vec<ContactRecord>) -> Result<usize>;

    async fn get(&self, portal_id: &str, id: &str) -> Result<Option<ContactRecord>>;
}

/// HubSpot CRM contacts endpoints.
#[async_trait]
pub trait ContactsApi: Send + Sync {
    /// Free-text search over name and email.
    async fn search_contacts(
        &self,
        access_token: &str,
        portal_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ContactRecord>>;

    /// Contacts modified strictly after `since` (all when `None`), oldest
    /// first.
    async fn contacts_modified_since(
        &self,
        access_token: &str,
        portal_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<ContactRecord>>;
}
