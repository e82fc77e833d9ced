//! Sync cursor port

use async_trait::async_trait;
use hubsync_domain::{Result, SyncCursor};

#[async_trait]
pub trait SyncCursorRepository: Send + Sync {
    async fn get(&self, portal_id: &str, object_type: &str) -> Result<Option<SyncCursor>>;

    /// Store `cursor` unless the saved one is newer. Returns the cursor now
    /// in effect.
    async fn advance(&self, cursor: SyncCursor) -> Result<SyncCursor>;
}
