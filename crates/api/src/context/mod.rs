//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use hubsync_common::resilience::{RateLimiter, RateLimiterConfig};
use hubsync_common::time::{SharedClock, SystemClock};
use hubsync_core::{
    ContactCacheRepository, ContactSearchService, ContactSyncPoller, OAuthFlowManager,
    OAuthStateRepository, PropertyChangeRepository, SharedRateLimiter, SyncCursorRepository,
    TokenRepository, TokenStore, WebhookIngester,
};
use hubsync_domain::{Config, HubSyncError, RateLimitProfile, Result};
use hubsync_infra::{
    ContactSyncScheduler, ContactSyncSchedulerConfig, HubSpotContactsClient, HubSpotOAuthClient,
    MemoryStore, OAuthStateSweeper, PostgresStore,
};
use tracing::{info, warn};

const START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub clock: SharedClock,
    pub tokens: Arc<TokenStore>,
    pub oauth: Arc<OAuthFlowManager>,
    pub search: Arc<ContactSearchService>,
    pub webhooks: Arc<WebhookIngester>,
    pub poller: Arc<ContactSyncPoller>,
}

impl AppContext {
    /// Build the context, using Postgres when `database.url` is set and the
    /// in-memory store otherwise.
    ///
    /// # Errors
    /// Fails when the database is unreachable, the schema cannot be applied
    /// or the HTTP clients cannot be built.
    pub async fn new(config: Config) -> Result<Self> {
        let clock: SharedClock = Arc::new(SystemClock);

        if config.database.url.is_some() {
            let store = PostgresStore::connect(&config.database).await?;
            store.migrate().await?;
            info!("using postgres store");
            Self::with_store(config, Arc::new(store), clock)
        } else {
            warn!("no database configured; credentials and cache live in memory only");
            Self::with_store(config, Arc::new(MemoryStore::new()), clock)
        }
    }

    /// Wire every service over one store implementing all repository ports.
    pub fn with_store<S>(config: Config, store: Arc<S>, clock: SharedClock) -> Result<Self>
    where
        S: TokenRepository
            + OAuthStateRepository
            + ContactCacheRepository
            + PropertyChangeRepository
            + SyncCursorRepository
            + 'static,
    {
        let oauth_client = Arc::new(HubSpotOAuthClient::new(&config.hubspot)?);
        let contacts_client = Arc::new(HubSpotContactsClient::new(&config.hubspot)?);

        let tokens = Arc::new(
            TokenStore::new(store.clone(), oauth_client.clone(), Arc::clone(&clock))
                .with_refresh_buffer(chrono::Duration::seconds(config.oauth.refresh_buffer_secs)),
        );

        let oauth = Arc::new(
            OAuthFlowManager::new(
                config.hubspot.clone(),
                store.clone(),
                oauth_client,
                Arc::clone(&tokens),
                Arc::clone(&clock),
            )
            .with_state_ttl(chrono::Duration::seconds(config.oauth.state_ttl_secs)),
        );

        let search = Arc::new(
            ContactSearchService::new(
                store.clone(),
                contacts_client.clone(),
                Arc::clone(&tokens),
                build_limiter(config.rate_limit.general, &clock)?,
                Arc::clone(&clock),
            )
            .with_min_local_results(config.search.min_local_results),
        );

        let webhooks = Arc::new(
            WebhookIngester::new(
                store.clone(),
                config.hubspot.client_secret.clone(),
                Arc::clone(&clock),
            )
            .with_default_portal(config.hubspot.default_portal_id.clone()),
        );

        // Background sync draws from the constrained profile.
        let poller = Arc::new(ContactSyncPoller::new(
            store.clone(),
            contacts_client,
            store,
            Arc::clone(&tokens),
            build_limiter(config.rate_limit.constrained, &clock)?,
        ));

        Ok(Self { config, clock, tokens, oauth, search, webhooks, poller })
    }
}

fn build_limiter(profile: RateLimitProfile, clock: &SharedClock) -> Result<SharedRateLimiter> {
    let config = RateLimiterConfig::builder()
        .max_burst(profile.max_burst)
        .window_millis(profile.window_ms)
        .build()
        .map_err(HubSyncError::Config)?;
    Ok(Arc::new(RateLimiter::with_clock(config, Arc::clone(clock))))
}

/// Schedulers owned by the running process.
pub struct BackgroundJobs {
    sweeper: OAuthStateSweeper,
    sync: Option<ContactSyncScheduler>,
}

impl BackgroundJobs {
    /// Start the state sweeper and, when enabled, the contact sync loop.
    ///
    /// # Errors
    /// Returns `HubSyncError::Internal` if a scheduler fails to start within
    /// ten seconds.
    pub async fn start(ctx: &AppContext) -> Result<Self> {
        let mut sweeper = OAuthStateSweeper::new(
            Arc::clone(&ctx.oauth),
            Duration::from_secs(ctx.config.oauth.state_sweep_interval_secs),
        );
        start_with_timeout("OAuthStateSweeper", sweeper.start()).await?;

        let sync = if ctx.config.sync.enabled {
            let config = ContactSyncSchedulerConfig {
                interval: Duration::from_secs(ctx.config.sync.interval_seconds),
                ..Default::default()
            };
            let mut scheduler = ContactSyncScheduler::new(Arc::clone(&ctx.poller), config);
            start_with_timeout("ContactSyncScheduler", scheduler.start()).await?;
            Some(scheduler)
        } else {
            info!("periodic contact sync disabled");
            None
        };

        Ok(Self { sweeper, sync })
    }

    /// Stop every running scheduler. Failures are logged, not returned.
    pub async fn shutdown(mut self) {
        if let Err(err) = self.sweeper.stop().await {
            warn!(error = %err, "failed to stop OAuthStateSweeper");
        }
        if let Some(mut sync) = self.sync.take() {
            if let Err(err) = sync.stop().await {
                warn!(error = %err, "failed to stop ContactSyncScheduler");
            }
        }
    }
}

async fn start_with_timeout<F, E>(name: &str, start: F) -> Result<()>
where
    F: std::future::Future<Output = std::result::Result<(), E>>,
    E: std::fmt::Display,
{
    tokio::time::timeout(START_TIMEOUT, start)
        .await
        .map_err(|_| {
            tracing::error!(scheduler = name, timeout_secs = 10, "scheduler start timed out");
            HubSyncError::Internal(format!("{name} start timed out after 10s"))
        })?
        .map_err(|err| {
            tracing::error!(scheduler = name, error = %err, "failed to start scheduler");
            HubSyncError::Internal(format!("failed to start {name}: {err}"))
        })
}
