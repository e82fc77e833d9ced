//! Domain constants
//!
//! Centralized defaults for the HubSpot integration. Runtime overrides live in
//! [`crate::config`].

// Token lifecycle
pub const DEFAULT_REFRESH_BUFFER_SECS: i64 = 60;
pub const DEFAULT_STATE_TTL_SECS: i64 = 3600;
pub const DEFAULT_STATE_SWEEP_INTERVAL_SECS: u64 = 900;

// Search
pub const DEFAULT_MIN_LOCAL_RESULTS: usize = 5;
pub const MAX_SEARCH_LIMIT: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Properties that feed the local full-text index and the remote search
/// filter groups.
pub const SEARCHABLE_PROPERTIES: &[&str] = &["firstname", "lastname", "email", "company"];

/// Properties requested from the CRM for every contact.
pub const CONTACT_PROPERTIES: &[&str] =
    &["firstname", "lastname", "email", "company", "jobtitle", "phone", "lastmodifieddate"];

// Sync
pub const SYNC_BATCH_LIMIT: usize = 100;
pub const OBJECT_TYPE_CONTACTS: &str = "contacts";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

// Rate limiting (HubSpot burst limits)
pub const GENERAL_MAX_BURST: u64 = 100;
pub const GENERAL_WINDOW_MS: u64 = 1_000;
pub const CONSTRAINED_MAX_BURST: u64 = 10;
pub const CONSTRAINED_WINDOW_MS: u64 = 60_000;

// Outbound HTTP
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// Webhooks
pub const WEBHOOK_MAX_TIMESTAMP_SKEW_MS: i64 = 300_000;
pub const SIGNATURE_V1_HEADER: &str = "x-hubspot-signature";
pub const SIGNATURE_V3_HEADER: &str = "x-hubspot-signature-v3";
pub const SIGNATURE_TIMESTAMP_HEADER: &str = "x-hubspot-request-timestamp";
