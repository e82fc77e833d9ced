//! OAuth flow manager
//!
//! Drives the authorization-code handshake: issue a CSRF state and consent
//! URL, then validate the callback, exchange the code and store the
//! resulting credentials under the portal they belong to.

use std::sync::Arc;

use chrono::Duration;
use hubsync_common::auth::generate_state;
use hubsync_common::time::SharedClock;
use hubsync_domain::constants::DEFAULT_STATE_TTL_SECS;
use hubsync_domain::{
    AuthorizationRequest, HubSpotConfig, HubSyncError, OAuthStateRecord, Result, TokenRecord,
};
use tracing::{info, instrument, warn};

use super::ports::{OAuthProvider, OAuthStateRepository};
use crate::tokens::TokenStore;

/// OAuth authorization-code flow for connecting portals
pub struct OAuthFlowManager {
    config: HubSpotConfig,
    states: Arc<dyn OAuthStateRepository>,
    provider: Arc<dyn OAuthProvider>,
    tokens: Arc<TokenStore>,
    clock: SharedClock,
    state_ttl: Duration,
}

impl OAuthFlowManager {
    /// Create a new flow manager with the default state TTL
    pub fn new(
        config: HubSpotConfig,
        states: Arc<dyn OAuthStateRepository>,
        provider: Arc<dyn OAuthProvider>,
        tokens: Arc<TokenStore>,
        clock: SharedClock,
    ) -> Self {
        Self {
            config,
            states,
            provider,
            tokens,
            clock,
            state_ttl: Duration::seconds(DEFAULT_STATE_TTL_SECS),
        }
    }

    #[must_use]
    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    /// Build the consent-page URL for `state`.
    pub fn authorization_url(&self, state: &str) -> String {
        let mut params = vec![
            ("client_id", self.config.client_id.clone()),
            ("scope", self.config.scopes.join(" ")),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("state", state.to_string()),
            ("response_type", "code".to_string()),
        ];
        if !self.config.optional_scopes.is_empty() {
            params.push(("optional_scope", self.config.optional_scopes.join(" ")));
        }

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}/oauth/authorize?{query_string}", self.config.auth_base_url.trim_end_matches('/'))
    }

    /// Start a connection attempt for `user_id`.
    #[instrument(skip(self))]
    pub async fn begin_authorization(&self, user_id: &str) -> Result<AuthorizationRequest> {
        if user_id.trim().is_empty() {
            return Err(HubSyncError::InvalidInput("user id is required".to_string()));
        }

        let now = self.clock.utc_now();
        let state = generate_state();
        let record = OAuthStateRecord {
            state: state.clone(),
            user_id: user_id.to_string(),
            expires_at: now + self.state_ttl,
            created_at: now,
        };
        let expires_at = record.expires_at;
        self.states.insert(record).await?;

        info!(%expires_at, "authorization started");
        Ok(AuthorizationRequest { url: self.authorization_url(&state), state, expires_at })
    }

    /// Finish a connection attempt from the OAuth callback.
    ///
    /// The state is consumed whether or not validation succeeds.
    ///
    /// # Errors
    /// - `InvalidState` when the state is unknown, expired or was issued to a
    ///   different user. The error carries no detail about which.
    /// - `Refresh` when HubSpot rejected the code
    /// - `ProviderUnavailable` when HubSpot could not be reached
    #[instrument(skip(self, code, state))]
    pub async fn complete_authorization(
        &self,
        user_id: &str,
        code: &str,
        state: &str,
    ) -> Result<TokenRecord> {
        let now = self.clock.utc_now();
        let pending = self.states.consume(state).await?;

        match pending {
            Some(record) if record.is_valid_for(user_id, now) => {}
            Some(record) => {
                warn!(
                    expired = record.is_expired(now),
                    user_mismatch = record.user_id != user_id,
                    "oauth state rejected"
                );
                return Err(HubSyncError::InvalidState);
            }
            None => {
                warn!("oauth state unknown");
                return Err(HubSyncError::InvalidState);
            }
        }

        if code.trim().is_empty() {
            return Err(HubSyncError::InvalidInput("authorization code is required".to_string()));
        }

        let grant = self.provider.exchange_code(code).await?;
        let info = self.provider.token_info(&grant.access_token).await?;

        let issued_at = self.clock.utc_now();
        let expires_at = grant.expires_at(issued_at)?;
        let scope = if grant.scope.is_empty() {
            info.scopes.iter().cloned().collect()
        } else {
            grant.scope
        };
        let record = TokenRecord {
            portal_id: info.hub_id.to_string(),
            user_id: user_id.to_string(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at,
            scope,
            updated_at: issued_at,
        };

        self.tokens.save(record.clone()).await?;
        info!(portal_id = %record.portal_id, "hubspot connected");
        Ok(record)
    }

    /// Drop every expired pending state.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let removed = self.states.delete_expired(self.clock.utc_now()).await?;
        if removed > 0 {
            info!(removed, "expired oauth states swept");
        }
        Ok(removed)
    }
}
