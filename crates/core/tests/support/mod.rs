//! Shared test helpers for `hubsync-core` integration tests.
//!
//! In-memory ports plus a scripted HubSpot, wired together by [`Harness`] so
//! each test only states the behaviour it cares about.

#![allow(dead_code)]

pub mod providers;
pub mod repositories;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hubsync_common::resilience::{RateLimiter, RateLimiterConfig};
use hubsync_common::time::{MockClock, SharedClock};
use hubsync_core::{
    ContactSearchService, ContactSyncPoller, OAuthFlowManager, SharedRateLimiter, TokenStore,
    WebhookIngester,
};
use hubsync_domain::{ContactRecord, HubSpotConfig, TokenRecord};
use serde_json::{Map, Value};

pub use providers::{FakeContactsApi, FakeOAuthProvider};
pub use repositories::{
    InMemoryContactCache, InMemoryCursorRepository, InMemoryStateRepository,
    InMemoryTokenRepository,
};

pub const PORTAL: &str = "62515";
pub const USER: &str = "user-1";
pub const APP_SECRET: &str = "app-secret";

pub struct Harness {
    pub clock: MockClock,
    pub shared_clock: SharedClock,
    pub tokens_repo: Arc<InMemoryTokenRepository>,
    pub states_repo: Arc<InMemoryStateRepository>,
    pub cache: Arc<InMemoryContactCache>,
    pub cursors: Arc<InMemoryCursorRepository>,
    pub provider: Arc<FakeOAuthProvider>,
    pub contacts_api: Arc<FakeContactsApi>,
    pub limiter: SharedRateLimiter,
    pub token_store: Arc<TokenStore>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = MockClock::new();
        let shared_clock: SharedClock = Arc::new(clock.clone());
        let tokens_repo = Arc::new(InMemoryTokenRepository::default());
        let provider = Arc::new(FakeOAuthProvider::new(62515));
        let token_store = Arc::new(TokenStore::new(
            tokens_repo.clone(),
            provider.clone(),
            Arc::clone(&shared_clock),
        ));
        let config = RateLimiterConfig::builder()
            .max_burst(100)
            .window_millis(1_000)
            .build()
            .expect("valid limiter config");

        Self {
            limiter: Arc::new(RateLimiter::with_clock(config, Arc::clone(&shared_clock))),
            clock,
            shared_clock,
            tokens_repo,
            states_repo: Arc::new(InMemoryStateRepository::default()),
            cache: Arc::new(InMemoryContactCache::default()),
            cursors: Arc::new(InMemoryCursorRepository::default()),
            provider,
            contacts_api: Arc::new(FakeContactsApi::default()),
            token_store,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        use hubsync_common::time::Clock;
        self.clock.utc_now()
    }

    /// Store credentials for [`PORTAL`] expiring `expires_in` from now.
    pub fn connect(&self, expires_in: Duration) -> TokenRecord {
        let now = self.now();
        let record = TokenRecord {
            portal_id: PORTAL.to_string(),
            user_id: USER.to_string(),
            access_token: "access-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: now + expires_in,
            scope: BTreeSet::from(["crm.objects.contacts.read".to_string()]),
            updated_at: now,
        };
        self.tokens_repo.insert(record.clone());
        record
    }

    pub fn hubspot_config(&self) -> HubSpotConfig {
        let mut config =
            HubSpotConfig::new("client-123", APP_SECRET, "https://app.example.com/hubspot/callback");
        config.auth_base_url = "https://auth.example.test".to_string();
        config
    }

    pub fn oauth(&self) -> OAuthFlowManager {
        OAuthFlowManager::new(
            self.hubspot_config(),
            self.states_repo.clone(),
            self.provider.clone(),
            Arc::clone(&self.token_store),
            Arc::clone(&self.shared_clock),
        )
    }

    pub fn search(&self) -> ContactSearchService {
        ContactSearchService::new(
            self.cache.clone(),
            self.contacts_api.clone(),
            Arc::clone(&self.token_store),
            Arc::clone(&self.limiter),
            Arc::clone(&self.shared_clock),
        )
    }

    pub fn webhooks(&self) -> WebhookIngester {
        WebhookIngester::new(self.cache.clone(), APP_SECRET, Arc::clone(&self.shared_clock))
    }

    pub fn poller(&self) -> ContactSyncPoller {
        ContactSyncPoller::new(
            self.cache.clone(),
            self.contacts_api.clone(),
            self.cursors.clone(),
            Arc::clone(&self.token_store),
            Arc::clone(&self.limiter),
        )
    }
}

/// Contact with the given id, first name and last-modified time.
pub fn contact(id: &str, firstname: &str, updated_at: DateTime<Utc>) -> ContactRecord {
    let mut properties = Map::new();
    properties.insert("firstname".to_string(), Value::String(firstname.to_string()));
    properties.insert(
        "email".to_string(),
        Value::String(format!("{}.{id}@example.com", firstname.to_lowercase())),
    );
    ContactRecord::new(PORTAL, id, properties, updated_at)
}

pub fn ids(records: &[ContactRecord]) -> Vec<&str> {
    records.iter().map(|record| record.id.as_str()).collect()
}
