//! Signed webhook ingestion

mod events;
pub mod ports;
pub mod service;

pub use events::parse_event;
pub use service::WebhookIngester;
