//! Webhook projection port

use async_trait::async_trait;
use hubsync_domain::{PropertyChangeRecord, Result};

#[async_trait]
pub trait PropertyChangeRepository: Send + Sync {
    /// Upsert keyed by `(portal_id, hubspot_id, property_name)` and merge the
    /// property into the cached contact row under last-write-wins.
    async fn upsert_change(&self, change: PropertyChangeRecord) -> Result<()>;
}
