//! Domain types and models

pub mod contacts;
pub mod oauth;
pub mod sync;
pub mod tokens;
pub mod webhook;

pub use contacts::{ContactRecord, SearchSource};
pub use oauth::{AuthorizationRequest, OAuthStateRecord};
pub use sync::{SyncCursor, SyncReport};
pub use tokens::{ConnectionStatus, TokenGrant, TokenInfo, TokenRecord};
pub use webhook::{PropertyChangeRecord, WebhookRequest, WebhookResponse};
