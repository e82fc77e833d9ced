//! Configuration structures
//!
//! Loaded by `hubsync-infra::config::loader` from environment variables or a
//! TOML/JSON file. Every section except `hubspot` has defaults, so a config
//! file only needs to carry the app credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONSTRAINED_MAX_BURST, CONSTRAINED_WINDOW_MS, DEFAULT_MIN_LOCAL_RESULTS,
    DEFAULT_REFRESH_BUFFER_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STATE_SWEEP_INTERVAL_SECS,
    DEFAULT_STATE_TTL_SECS, DEFAULT_SYNC_INTERVAL_SECS, GENERAL_MAX_BURST, GENERAL_WINDOW_MS,
};

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub hubspot: HubSpotConfig,
    #[serde(default)]
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// HubSpot app credentials and endpoints
#[derive(Clone, Serialize, Deserialize)]
pub struct HubSpotConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub optional_scopes: Vec<String>,
    /// Host of the user-facing consent page.
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
    /// Host of the REST API (token, introspection and CRM endpoints).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Portal used for webhook events that omit `portalId`.
    #[serde(default)]
    pub default_portal_id: Option<String>,
    /// Public origin HubSpot posts webhooks to (e.g. `https://hooks.example.com`).
    /// v3 signatures cover the full URI, so it must match what HubSpot saw.
    #[serde(default)]
    pub webhook_base_url: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl fmt::Debug for HubSpotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubSpotConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("optional_scopes", &self.optional_scopes)
            .field("auth_base_url", &self.auth_base_url)
            .field("api_base_url", &self.api_base_url)
            .field("default_portal_id", &self.default_portal_id)
            .field("webhook_base_url", &self.webhook_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl HubSpotConfig {
    /// Creates a config pointing at the public HubSpot hosts.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: default_scopes(),
            optional_scopes: Vec::new(),
            auth_base_url: default_auth_base_url(),
            api_base_url: default_api_base_url(),
            default_portal_id: None,
            webhook_base_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// OAuth lifecycle tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    /// Seconds before expiry at which a token counts as stale.
    pub refresh_buffer_secs: i64,
    pub state_ttl_secs: i64,
    pub state_sweep_interval_secs: u64,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
            state_ttl_secs: DEFAULT_STATE_TTL_SECS,
            state_sweep_interval_secs: DEFAULT_STATE_SWEEP_INTERVAL_SECS,
        }
    }
}

/// A single token-bucket profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitProfile {
    pub max_burst: u64,
    pub window_ms: u64,
}

impl RateLimitProfile {
    /// 100 requests per second, the default per-app burst.
    pub const GENERAL: Self = Self { max_burst: GENERAL_MAX_BURST, window_ms: GENERAL_WINDOW_MS };
    /// 10 requests per minute, used for constrained endpoints.
    pub const CONSTRAINED: Self =
        Self { max_burst: CONSTRAINED_MAX_BURST, window_ms: CONSTRAINED_WINDOW_MS };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub general: RateLimitProfile,
    pub constrained: RateLimitProfile,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self { general: RateLimitProfile::GENERAL, constrained: RateLimitProfile::CONSTRAINED }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Local hits at or above this count skip the remote call.
    pub min_local_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { min_local_results: DEFAULT_MIN_LOCAL_RESULTS }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub interval_seconds: u64,
    pub enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_seconds: DEFAULT_SYNC_INTERVAL_SECS, enabled: false }
    }
}

/// Durable store settings. Without a URL the in-memory store is used.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tls: bool,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("tls", &self.tls)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".to_string() }
    }
}

fn default_scopes() -> Vec<String> {
    vec!["crm.objects.contacts.read".to_string(), "oauth".to_string()]
}

fn default_auth_base_url() -> String {
    "https://app.hubspot.com".to_string()
}

fn default_api_base_url() -> String {
    "https://api.hubapi.com".to_string()
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
