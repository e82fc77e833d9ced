//! # HubSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for stores and the HubSpot API
//! - The token lifecycle, OAuth handshake, contact search, webhook ingestion
//!   and incremental sync services
//!
//! ## Architecture Principles
//! - Only depends on `hubsync-common` and `hubsync-domain`
//! - No database or HTTP code
//! - All external dependencies via traits

pub mod oauth;
pub mod search;
pub mod sync;
pub mod tokens;
pub mod webhook;

use std::sync::Arc;

use hubsync_common::resilience::RateLimiter;
use hubsync_common::time::SharedClock;

/// Rate limiter shape shared by every service that calls HubSpot.
pub type SharedRateLimiter = Arc<RateLimiter<SharedClock>>;

// Re-export specific items to avoid ambiguity
pub use oauth::ports::{OAuthProvider, OAuthStateRepository};
pub use oauth::OAuthFlowManager;
pub use search::ports::{ContactCacheRepository, ContactsApi};
pub use search::{ContactSearchService, SearchOutcome};
pub use sync::ports::SyncCursorRepository;
pub use sync::ContactSyncPoller;
pub use tokens::ports::TokenRepository;
pub use tokens::TokenStore;
pub use webhook::ports::PropertyChangeRepository;
pub use webhook::WebhookIngester;
