//! Error types used throughout the integration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for HubSync
///
/// Variants follow the integration's failure taxonomy. Use [`HubSyncError::kind`]
/// to decide between "show reconnect", "retry later" and "reject".
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum HubSyncError {
    /// No stored credential for the tenant.
    #[error("HubSpot not connected: {0}")]
    TokenFetch(String),

    /// The provider rejected a refresh attempt; credentials were dropped.
    #[error("Token refresh rejected: {0}")]
    Refresh(String),

    /// CSRF state missing, expired, or bound to another user. Carries no
    /// detail on purpose.
    #[error("HubSpot connection failed")]
    InvalidState,

    /// Remote contact search failed.
    #[error("Contact search failed: {0}")]
    Search(String),

    /// Webhook signature missing or invalid.
    #[error("Webhook signature rejected: {0}")]
    Signature(String),

    /// A single webhook event failed shape validation.
    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),

    /// Provider unreachable, timed out, or answered 5xx.
    #[error("HubSpot unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No credentials; the UI should offer "connect".
    NotConnected,
    /// Credentials were revoked by the provider; the UI should offer
    /// "reconnect".
    RefreshFailed,
    /// Transient; safe to retry later.
    ProviderUnavailable,
    /// The request itself was refused (bad state, bad signature, bad input).
    Rejected,
    Internal,
}

impl HubSyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TokenFetch(_) => ErrorKind::NotConnected,
            Self::Refresh(_) => ErrorKind::RefreshFailed,
            Self::Search(_) | Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            Self::InvalidState
            | Self::Signature(_)
            | Self::MalformedEvent(_)
            | Self::InvalidInput(_) => ErrorKind::Rejected,
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable label suitable for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TokenFetch(_) => "token_fetch",
            Self::Refresh(_) => "refresh",
            Self::InvalidState => "invalid_state",
            Self::Search(_) => "search",
            Self::Signature(_) => "signature",
            Self::MalformedEvent(_) => "malformed_event",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }

    /// True when the tenant must go through the OAuth flow again.
    pub fn requires_reconnect(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotConnected | ErrorKind::RefreshFailed)
    }
}

/// Result type alias for HubSync operations
pub type Result<T> = std::result::Result<T, HubSyncError>;
