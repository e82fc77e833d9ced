//! Credential records

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{HubSyncError, Result};
use crate::impl_status_conversions;

/// Stored OAuth credentials for one HubSpot portal.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// HubSpot hub id, rendered as a string. Primary key.
    pub portal_id: String,
    /// User that connected the portal.
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scope: BTreeSet<String>,
    pub updated_at: DateTime<Utc>,
}

impl TokenRecord {
    /// True when the access token stays valid for longer than `buffer`.
    pub fn is_fresh(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        self.expires_at > now + buffer
    }

    /// Applies a refresh grant. Keeps the stored refresh token when the
    /// provider does not rotate it. The record is left untouched when the
    /// grant carries an unusable lifetime.
    pub fn apply_refresh(&mut self, grant: TokenGrant, now: DateTime<Utc>) -> Result<()> {
        self.expires_at = grant.expires_at(now)?;
        self.access_token = grant.access_token;
        if grant.refresh_token.is_some() {
            self.refresh_token = grant.refresh_token;
        }
        if !grant.scope.is_empty() {
            self.scope = grant.scope;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("portal_id", &self.portal_id)
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Token endpoint response, already normalized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: i64,
    #[serde(default)]
    pub scope: BTreeSet<String>,
}

impl TokenGrant {
    /// Expiry of a token issued at `issued_at`.
    ///
    /// # Errors
    /// `ProviderUnavailable` when `expires_in` is not positive or does not fit
    /// a timestamp.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if self.expires_in <= 0 {
            return Err(HubSyncError::ProviderUnavailable(format!(
                "token lifetime must be positive, got {}s",
                self.expires_in
            )));
        }
        Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                HubSyncError::ProviderUnavailable(format!(
                    "token lifetime out of range: {}s",
                    self.expires_in
                ))
            })
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Metadata returned by the access-token introspection endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub hub_id: u64,
    pub user: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Connection state of a user's HubSpot integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Client-side transient while a status request is in flight.
    Checking,
    Connected,
    Disconnected,
}

impl_status_conversions!(ConnectionStatus {
    Checking => "checking",
    Connected => "connected",
    Disconnected => "disconnected",
});
