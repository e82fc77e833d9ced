//! Webhook transport and projection types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest observed value of one contact property.
///
/// Unique on `(portal_id, hubspot_id, property_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChangeRecord {
    pub portal_id: String,
    pub hubspot_id: String,
    pub property_name: String,
    pub property_value: String,
    pub change_source: String,
    pub occurred_at: DateTime<Utc>,
}

/// Transport-neutral view of an inbound webhook call.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub method: String,
    /// Full request URI as HubSpot signed it (scheme, host, path, query).
    pub uri: String,
    /// Header names are stored lowercased.
    headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl WebhookRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { method: method.into(), uri: uri.into(), headers: BTreeMap::new(), body: body.into() }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Status the transport should answer with. Bodies are always empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: u16,
}

impl WebhookResponse {
    pub const ACCEPTED: Self = Self { status: 204 };
    pub const BAD_REQUEST: Self = Self { status: 400 };
    pub const UNAUTHORIZED: Self = Self { status: 401 };
    pub const METHOD_NOT_ALLOWED: Self = Self { status: 405 };
    pub const SERVER_ERROR: Self = Self { status: 500 };
}
