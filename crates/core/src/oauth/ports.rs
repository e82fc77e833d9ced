//! OAuth provider and CSRF state ports

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_domain::{OAuthStateRecord, Result, TokenGrant, TokenInfo};

/// HubSpot's OAuth endpoints.
///
/// Implementations map a rejected grant (`invalid_grant`, 400/401) to
/// `HubSyncError::Refresh` and transport failures, timeouts and 5xx to
/// `HubSyncError::ProviderUnavailable`.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Exchange an authorization code (`grant_type=authorization_code`).
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant>;

    /// Exchange a refresh token (`grant_type=refresh_token`).
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;

    /// Introspect an access token to learn which portal it belongs to.
    async fn token_info(&self, access_token: &str) -> Result<TokenInfo>;
}

/// Storage for pending CSRF states.
#[async_trait]
pub trait OAuthStateRepository: Send + Sync {
    async fn insert(&self, record: OAuthStateRecord) -> Result<()>;

    /// Remove and return the record in one atomic step.
    async fn consume(&self, state: &str) -> Result<Option<OAuthStateRecord>>;

    /// Delete every record with `expires_at <= now`. Returns how many.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
