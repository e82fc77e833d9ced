//! Incremental sync bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// High-water mark for one `(portal_id, object_type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub portal_id: String,
    pub object_type: String,
    pub hs_timestamp: DateTime<Utc>,
}

impl SyncCursor {
    /// Moves the cursor forward. Older values are ignored.
    pub fn advance(&mut self, candidate: DateTime<Utc>) -> bool {
        if candidate > self.hs_timestamp {
            self.hs_timestamp = candidate;
            true
        } else {
            false
        }
    }
}

/// Result of one pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub portal_id: String,
    pub fetched: usize,
    pub upserted: usize,
    /// Cursor after the pull; `None` when nothing was ever synced.
    pub cursor: Option<DateTime<Utc>>,
    /// The batch was full, so more changes may be waiting.
    pub has_more: bool,
}
