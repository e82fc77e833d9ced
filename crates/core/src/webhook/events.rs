//! Webhook event validation

use chrono::{DateTime, TimeZone, Utc};
use hubsync_domain::{HubSyncError, PropertyChangeRecord, Result};
use serde_json::Value;

fn required_str<'a>(event: &'a Value, field: &str) -> Result<&'a str> {
    event
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| HubSyncError::MalformedEvent(format!("{field} must be a string")))
}

fn optional_u64(event: &Value, field: &str) -> Result<Option<u64>> {
    match event.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| HubSyncError::MalformedEvent(format!("{field} must be numeric"))),
    }
}

/// Validate one element of a webhook batch.
///
/// `portalId` falls back to `default_portal`; `occurredAt` (epoch millis)
/// falls back to `now`.
pub fn parse_event(
    event: &Value,
    default_portal: Option<&str>,
    now: DateTime<Utc>,
) -> Result<PropertyChangeRecord> {
    if !event.is_object() {
        return Err(HubSyncError::MalformedEvent("event must be an object".to_string()));
    }

    let object_id = optional_u64(event, "objectId")?
        .ok_or_else(|| HubSyncError::MalformedEvent("objectId must be numeric".to_string()))?;
    let property_name = required_str(event, "propertyName")?;
    let property_value = required_str(event, "propertyValue")?;
    let change_source = required_str(event, "changeSource")?;

    let portal_id = match optional_u64(event, "portalId")? {
        Some(id) => id.to_string(),
        None => default_portal
            .map(str::to_string)
            .ok_or_else(|| HubSyncError::MalformedEvent("portalId missing".to_string()))?,
    };

    let occurred_at = match optional_u64(event, "occurredAt")? {
        Some(millis) => i64::try_from(millis)
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .ok_or_else(|| HubSyncError::MalformedEvent("occurredAt out of range".to_string()))?,
        None => now,
    };

    if property_name.is_empty() {
        return Err(HubSyncError::MalformedEvent("propertyName must not be empty".to_string()));
    }

    Ok(PropertyChangeRecord {
        portal_id,
        hubspot_id: object_id.to_string(),
        property_name: property_name.to_string(),
        property_value: property_value.to_string(),
        change_source: change_source.to_string(),
        occurred_at,
    })
}
