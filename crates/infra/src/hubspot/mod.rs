//! HubSpot HTTP adapters

pub mod contacts_client;
pub mod oauth_client;
mod types;

pub use contacts_client::HubSpotContactsClient;
pub use oauth_client::HubSpotOAuthClient;
