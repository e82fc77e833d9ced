//! OAuth handshake records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pending CSRF state for one authorization attempt. Single use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthStateRecord {
    pub state: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OAuthStateRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Valid for completing `user_id`'s authorization at `now`.
    pub fn is_valid_for(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        self.user_id == user_id && !self.is_expired(now)
    }
}

/// Where to send the user to grant access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub expires_at: DateTime<Utc>,
}
