//! Shared wiring for infra integration tests: real HubSpot clients pointed
//! at a WireMock server, backed by the in-memory store.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hubsync_common::resilience::{RateLimiter, RateLimiterConfig};
use hubsync_common::time::{SharedClock, SystemClock};
use hubsync_core::{
    ContactSyncPoller, OAuthFlowManager, SharedRateLimiter, TokenRepository, TokenStore,
};
use hubsync_domain::{HubSpotConfig, TokenRecord};
use hubsync_infra::{HubSpotContactsClient, HubSpotOAuthClient, MemoryStore};
use wiremock::MockServer;

pub const PORTAL: &str = "62515";
pub const USER: &str = "user-1";

pub struct TestStack {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
    pub oauth_client: Arc<HubSpotOAuthClient>,
    pub contacts_client: Arc<HubSpotContactsClient>,
    pub token_store: Arc<TokenStore>,
    pub clock: SharedClock,
}

impl TestStack {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let config = hubspot_config(&server.uri());
        let clock: SharedClock = Arc::new(SystemClock);
        let store = Arc::new(MemoryStore::new());
        let oauth_client = Arc::new(HubSpotOAuthClient::new(&config).unwrap());
        let contacts_client = Arc::new(HubSpotContactsClient::new(&config).unwrap());
        let token_store =
            Arc::new(TokenStore::new(store.clone(), oauth_client.clone(), Arc::clone(&clock)));

        Self { server, store, oauth_client, contacts_client, token_store, clock }
    }

    pub fn config(&self) -> HubSpotConfig {
        hubspot_config(&self.server.uri())
    }

    /// Store credentials for `portal_id` that expire `expires_in` from now.
    pub async fn connect(&self, portal_id: &str, expires_in: Duration) -> TokenRecord {
        let now = Utc::now();
        let record = TokenRecord {
            portal_id: portal_id.to_string(),
            user_id: USER.to_string(),
            access_token: format!("access-{portal_id}"),
            refresh_token: Some(format!("refresh-{portal_id}")),
            expires_at: now + expires_in,
            scope: BTreeSet::from(["crm.objects.contacts.read".to_string()]),
            updated_at: now,
        };
        TokenRepository::upsert(self.store.as_ref(), record.clone()).await.unwrap();
        record
    }

    pub fn oauth_flow(&self) -> OAuthFlowManager {
        OAuthFlowManager::new(
            self.config(),
            self.store.clone(),
            self.oauth_client.clone(),
            Arc::clone(&self.token_store),
            Arc::clone(&self.clock),
        )
    }

    pub fn poller(&self) -> ContactSyncPoller {
        self.poller_with_limiter(self.limiter(100, 1_000))
    }

    pub fn limiter(&self, max_burst: u64, window_ms: u64) -> SharedRateLimiter {
        let limiter_config =
            RateLimiterConfig::builder().max_burst(max_burst).window_millis(window_ms).build().unwrap();
        Arc::new(RateLimiter::with_clock(limiter_config, Arc::clone(&self.clock)))
    }

    pub fn poller_with_limiter(&self, limiter: SharedRateLimiter) -> ContactSyncPoller {
        ContactSyncPoller::new(
            self.store.clone(),
            self.contacts_client.clone(),
            self.store.clone(),
            Arc::clone(&self.token_store),
            limiter,
        )
    }
}

pub fn hubspot_config(base_url: &str) -> HubSpotConfig {
    let mut config =
        HubSpotConfig::new("client-123", "secret-456", "https://app.example.com/hubspot/callback");
    config.api_base_url = base_url.to_string();
    config.auth_base_url = base_url.to_string();
    config.request_timeout_secs = 2;
    config
}

/// CRM search result object as HubSpot renders it.
pub fn crm_contact(id: &str, firstname: &str, updated_at: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "properties": {
            "firstname": firstname,
            "email": format!("{}@example.com", firstname.to_lowercase()),
            "lastmodifieddate": updated_at.to_rfc3339(),
        },
        "createdAt": updated_at.to_rfc3339(),
        "updatedAt": updated_at.to_rfc3339(),
        "archived": false
    })
}
