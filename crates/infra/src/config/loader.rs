//! Configuration loader
//!
//! Loads the service configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Attempt to load from `HUBSYNC_*` environment variables
//! 2. If the required ones are missing, fall back to a config file
//! 3. Probe several paths for that file
//! 4. Accept JSON and TOML
//!
//! ## Environment Variables
//! Required:
//! - `HUBSYNC_CLIENT_ID`, `HUBSYNC_CLIENT_SECRET`, `HUBSYNC_REDIRECT_URI`
//!
//! Optional:
//! - `HUBSYNC_SCOPES`, `HUBSYNC_OPTIONAL_SCOPES`: space or comma separated
//! - `HUBSYNC_AUTH_BASE_URL`, `HUBSYNC_API_BASE_URL`
//! - `HUBSYNC_DEFAULT_PORTAL_ID`, `HUBSYNC_WEBHOOK_BASE_URL`
//! - `HUBSYNC_REQUEST_TIMEOUT_SECS`
//! - `HUBSYNC_REFRESH_BUFFER_SECS`, `HUBSYNC_STATE_TTL_SECS`
//! - `HUBSYNC_MIN_LOCAL_RESULTS`
//! - `HUBSYNC_SYNC_INTERVAL`, `HUBSYNC_SYNC_ENABLED`
//! - `HUBSYNC_DATABASE_URL`, `HUBSYNC_DATABASE_TLS`
//! - `HUBSYNC_BIND_ADDR`
//!
//! ## File Locations
//! `hubsync.toml`, `hubsync.json`, `config.toml`, `config.json`, looked up in
//! the working directory, its two parents, then next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use hubsync_domain::{
    Config, DatabaseConfig, HubSpotConfig, HubSyncError, OAuthSettings, RateLimitSettings, Result,
    SearchConfig, ServerConfig, SyncConfig,
};

const FILE_NAMES: [&str; 4] = ["hubsync.toml", "hubsync.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `HubSyncError::Config` if neither source yields a valid config.
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "environment incomplete, trying config file");
            load_from_file(None)?
        }
    };
    validate(&config)?;
    Ok(config)
}

/// Load configuration from `HUBSYNC_*` variables.
///
/// # Errors
/// Returns `HubSyncError::Config` if a required variable is missing or a
/// numeric one does not parse.
pub fn load_from_env() -> Result<Config> {
    let mut hubspot = HubSpotConfig::new(
        env_var("HUBSYNC_CLIENT_ID")?,
        env_var("HUBSYNC_CLIENT_SECRET")?,
        env_var("HUBSYNC_REDIRECT_URI")?,
    );
    if let Some(scopes) = env_opt("HUBSYNC_SCOPES") {
        hubspot.scopes = split_list(&scopes);
    }
    if let Some(scopes) = env_opt("HUBSYNC_OPTIONAL_SCOPES") {
        hubspot.optional_scopes = split_list(&scopes);
    }
    if let Some(url) = env_opt("HUBSYNC_AUTH_BASE_URL") {
        hubspot.auth_base_url = url;
    }
    if let Some(url) = env_opt("HUBSYNC_API_BASE_URL") {
        hubspot.api_base_url = url;
    }
    hubspot.default_portal_id = env_opt("HUBSYNC_DEFAULT_PORTAL_ID");
    hubspot.webhook_base_url = env_opt("HUBSYNC_WEBHOOK_BASE_URL");
    if let Some(secs) = env_parse("HUBSYNC_REQUEST_TIMEOUT_SECS")? {
        hubspot.request_timeout_secs = secs;
    }

    let mut oauth = OAuthSettings::default();
    if let Some(secs) = env_parse("HUBSYNC_REFRESH_BUFFER_SECS")? {
        oauth.refresh_buffer_secs = secs;
    }
    if let Some(secs) = env_parse("HUBSYNC_STATE_TTL_SECS")? {
        oauth.state_ttl_secs = secs;
    }

    let mut search = SearchConfig::default();
    if let Some(min) = env_parse("HUBSYNC_MIN_LOCAL_RESULTS")? {
        search.min_local_results = min;
    }

    let mut sync = SyncConfig::default();
    if let Some(secs) = env_parse("HUBSYNC_SYNC_INTERVAL")? {
        sync.interval_seconds = secs;
    }
    sync.enabled = env_bool("HUBSYNC_SYNC_ENABLED", sync.enabled);

    let database = DatabaseConfig {
        url: env_opt("HUBSYNC_DATABASE_URL"),
        tls: env_bool("HUBSYNC_DATABASE_TLS", false),
    };

    let mut server = ServerConfig::default();
    if let Some(addr) = env_opt("HUBSYNC_BIND_ADDR") {
        server.bind_addr = addr;
    }

    Ok(Config {
        hubspot,
        oauth,
        rate_limit: RateLimitSettings::default(),
        search,
        sync,
        database,
        server,
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `HubSyncError::Config` if the file is missing, unreadable or
/// does not parse.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(HubSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            HubSyncError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| HubSyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| HubSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| HubSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(HubSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Reject configurations the services cannot run with.
///
/// # Errors
/// Returns `HubSyncError::Config` naming the first offending field.
pub fn validate(config: &Config) -> Result<()> {
    let required = [
        ("hubspot.client_id", &config.hubspot.client_id),
        ("hubspot.client_secret", &config.hubspot.client_secret),
        ("hubspot.redirect_uri", &config.hubspot.redirect_uri),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(HubSyncError::Config(format!("{name} must not be empty")));
        }
    }

    if config.hubspot.scopes.is_empty() {
        return Err(HubSyncError::Config("hubspot.scopes must list at least one scope".into()));
    }
    if config.hubspot.request_timeout_secs == 0 {
        return Err(HubSyncError::Config("hubspot.request_timeout_secs must be positive".into()));
    }
    if config.oauth.state_ttl_secs <= 0 {
        return Err(HubSyncError::Config("oauth.state_ttl_secs must be positive".into()));
    }
    if config.oauth.refresh_buffer_secs < 0 {
        return Err(HubSyncError::Config("oauth.refresh_buffer_secs must not be negative".into()));
    }

    for (name, profile) in
        [("general", config.rate_limit.general), ("constrained", config.rate_limit.constrained)]
    {
        if profile.max_burst == 0 || profile.window_ms == 0 {
            return Err(HubSyncError::Config(format!(
                "rate_limit.{name} needs a positive max_burst and window_ms"
            )));
        }
    }

    if config.sync.enabled && config.sync.interval_seconds == 0 {
        return Err(HubSyncError::Config("sync.interval_seconds must be positive".into()));
    }

    Ok(())
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        HubSyncError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Set and non-blank.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| HubSyncError::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
