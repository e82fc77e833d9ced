//! Token persistence port

use async_trait::async_trait;
use hubsync_domain::{Result, TokenRecord};

/// Durable storage for [`TokenRecord`]s, keyed by portal id.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Load the record for a portal.
    async fn get(&self, portal_id: &str) -> Result<Option<TokenRecord>>;

    /// Insert or replace the record for `record.portal_id`.
    async fn upsert(&self, record: TokenRecord) -> Result<()>;

    /// Delete the record. Returns whether one existed.
    async fn delete(&self, portal_id: &str) -> Result<bool>;

    /// Most recently updated record connected by `user_id`.
    async fn find_by_user(&self, user_id: &str) -> Result<Option<TokenRecord>>;

    /// Every portal that currently holds credentials.
    async fn list_portals(&self) -> Result<Vec<String>>;
}
