//! Webhook ingester
//!
//! Authenticates HubSpot property-change batches and projects each event into
//! the property-change table and the contact cache. The ingester does not
//! need OAuth tokens; it only needs the app secret.

use std::sync::Arc;

use chrono::Duration;
use hubsync_common::security::{verify_v1_signature, verify_v3_signature};
use hubsync_common::time::SharedClock;
use hubsync_domain::constants::{
    SIGNATURE_TIMESTAMP_HEADER, SIGNATURE_V1_HEADER, SIGNATURE_V3_HEADER,
    WEBHOOK_MAX_TIMESTAMP_SKEW_MS,
};
use hubsync_domain::{HubSyncError, Result, WebhookRequest, WebhookResponse};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use super::events::parse_event;
use super::ports::PropertyChangeRepository;

/// HubSpot webhook ingester
pub struct WebhookIngester {
    changes: Arc<dyn PropertyChangeRepository>,
    client_secret: String,
    default_portal_id: Option<String>,
    clock: SharedClock,
    max_skew: Duration,
}

impl WebhookIngester {
    /// Create a new ingester that verifies against `client_secret`
    pub fn new(
        changes: Arc<dyn PropertyChangeRepository>,
        client_secret: impl Into<String>,
        clock: SharedClock,
    ) -> Self {
        Self {
            changes,
            client_secret: client_secret.into(),
            default_portal_id: None,
            clock,
            max_skew: Duration::milliseconds(WEBHOOK_MAX_TIMESTAMP_SKEW_MS),
        }
    }

    /// Portal assigned to events that omit `portalId`.
    #[must_use]
    pub fn with_default_portal(mut self, portal_id: Option<String>) -> Self {
        self.default_portal_id = portal_id;
        self
    }

    /// Check the v3 signature (preferred) or the legacy v1 signature.
    pub fn verify_signature(&self, request: &WebhookRequest) -> Result<()> {
        if let Some(signature) = request.header(SIGNATURE_V3_HEADER) {
            let timestamp = request.header(SIGNATURE_TIMESTAMP_HEADER).ok_or_else(|| {
                HubSyncError::Signature("missing request timestamp".to_string())
            })?;
            let sent_ms: i64 = timestamp
                .trim()
                .parse()
                .map_err(|_| HubSyncError::Signature("invalid request timestamp".to_string()))?;
            let skew = self.clock.utc_now().timestamp_millis().abs_diff(sent_ms);
            if skew > self.max_skew.num_milliseconds().unsigned_abs() {
                return Err(HubSyncError::Signature("request timestamp too old".to_string()));
            }

            return if verify_v3_signature(
                &self.client_secret,
                &request.method,
                &request.uri,
                &request.body,
                timestamp.trim(),
                signature,
            ) {
                Ok(())
            } else {
                Err(HubSyncError::Signature("v3 signature mismatch".to_string()))
            };
        }

        if let Some(signature) = request.header(SIGNATURE_V1_HEADER) {
            return if verify_v1_signature(&self.client_secret, &request.body, signature) {
                Ok(())
            } else {
                Err(HubSyncError::Signature("v1 signature mismatch".to_string()))
            };
        }

        Err(HubSyncError::Signature("signature header missing".to_string()))
    }

    /// Process one inbound webhook call.
    ///
    /// Answers 405 for non-POST, 401 for bad signatures (before parsing), 400
    /// when the body is not a JSON array, 500 when persisting fails and 204
    /// otherwise. Individually malformed events are logged and skipped.
    #[instrument(skip(self, request), fields(method = %request.method, bytes = request.body.len()))]
    pub async fn handle(&self, request: &WebhookRequest) -> WebhookResponse {
        if !request.method.eq_ignore_ascii_case("POST") {
            return WebhookResponse::METHOD_NOT_ALLOWED;
        }

        if let Err(err) = self.verify_signature(request) {
            warn!(error = %err, "webhook rejected");
            return WebhookResponse::UNAUTHORIZED;
        }

        let events = match serde_json::from_slice::<Value>(&request.body) {
            Ok(Value::Array(events)) => events,
            Ok(_) => {
                warn!("webhook body is not a JSON array");
                return WebhookResponse::BAD_REQUEST;
            }
            Err(err) => {
                warn!(error = %err, "webhook body is not valid JSON");
                return WebhookResponse::BAD_REQUEST;
            }
        };

        let now = self.clock.utc_now();
        let total = events.len();
        let mut applied = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for (index, event) in events.iter().enumerate() {
            let change = match parse_event(event, self.default_portal_id.as_deref(), now) {
                Ok(change) => change,
                Err(err) => {
                    warn!(index, error = %err, "skipping webhook event");
                    skipped += 1;
                    continue;
                }
            };

            debug!(
                portal_id = %change.portal_id,
                hubspot_id = %change.hubspot_id,
                property = %change.property_name,
                "applying property change"
            );
            if let Err(err) = self.changes.upsert_change(change).await {
                error!(index, error = %err, "failed to store webhook event");
                failed += 1;
            } else {
                applied += 1;
            }
        }

        info!(total, applied, skipped, failed, "webhook batch processed");
        if failed > 0 {
            WebhookResponse::SERVER_ERROR
        } else {
            WebhookResponse::ACCEPTED
        }
    }
}
