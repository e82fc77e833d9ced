//! HubSpot wire formats

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use hubsync_domain::{ContactRecord, TokenGrant, TokenInfo};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `POST /oauth/v1/token` success body.
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    /// Not sent by HubSpot today; accepted when present.
    #[serde(default)]
    pub scope: Option<String>,
}

impl From<TokenResponse> for TokenGrant {
    fn from(value: TokenResponse) -> Self {
        let scope: BTreeSet<String> = value
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            access_token: value.access_token,
            refresh_token: value.refresh_token,
            expires_in: value.expires_in,
            scope,
        }
    }
}

/// Error body of the OAuth endpoints. HubSpot sends either the RFC 6749
/// shape or its own `status`/`message` pair.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct OAuthErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl OAuthErrorBody {
    /// One-line `code: description` rendering
    pub fn summary(&self) -> String {
        let code = self.error.as_deref().or(self.status.as_deref()).unwrap_or("unknown_error");
        match self.error_description.as_deref().or(self.message.as_deref()) {
            Some(detail) => format!("{code}: {detail}"),
            None => code.to_string(),
        }
    }
}

/// `GET /oauth/v1/access-tokens/{token}` body.
#[derive(Deserialize)]
pub(crate) struct AccessTokenInfo {
    pub hub_id: u64,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl From<AccessTokenInfo> for TokenInfo {
    fn from(value: AccessTokenInfo) -> Self {
        Self { hub_id: value.hub_id, user: value.user, scopes: value.scopes }
    }
}

/// `POST /crm/v3/objects/contacts/search` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter_groups: Vec<FilterGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<Sort>,
    pub properties: Vec<String>,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct FilterGroup {
    pub filters: Vec<Filter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Filter {
    pub property_name: String,
    pub operator: &'static str,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Sort {
    pub property_name: String,
    pub direction: &'static str,
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<CrmObject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CrmObject {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CrmObject {
    /// `updatedAt`, else the `lastmodifieddate` property, else `fallback`.
    pub fn into_contact(self, portal_id: &str, fallback: DateTime<Utc>) -> ContactRecord {
        let updated_at = self
            .updated_at
            .or_else(|| {
                self.properties
                    .get("lastmodifieddate")
                    .and_then(Value::as_str)
                    .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                    .map(|ts| ts.with_timezone(&Utc))
            })
            .unwrap_or(fallback);

        ContactRecord::new(portal_id, self.id, self.properties, updated_at)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn token_response_without_scope_yields_empty_set() {
        let body: TokenResponse = serde_json::from_value(json!({
            "access_token": "a", "refresh_token": "r", "expires_in": 1800, "token_type": "bearer"
        }))
        .unwrap();
        let grant = TokenGrant::from(body);
        assert_eq!(grant.expires_in, 1800);
        assert!(grant.scope.is_empty());
        assert_eq!(grant.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn error_body_prefers_oauth_fields() {
        let body: OAuthErrorBody = serde_json::from_value(json!({
            "error": "invalid_grant", "error_description": "refresh token revoked"
        }))
        .unwrap();
        assert_eq!(body.summary(), "invalid_grant: refresh token revoked");

        let hubspot: OAuthErrorBody = serde_json::from_value(json!({
            "status": "BAD_REFRESH_TOKEN", "message": "missing or unknown refresh token"
        }))
        .unwrap();
        assert_eq!(hubspot.summary(), "BAD_REFRESH_TOKEN: missing or unknown refresh token");
    }

    #[test]
    fn search_request_uses_camel_case_and_skips_empty_filters() {
        let request = SearchRequest {
            filter_groups: Vec::new(),
            sorts: vec![Sort { property_name: "lastmodifieddate".into(), direction: "ASCENDING" }],
            properties: vec!["email".into()],
            limit: 100,
        };
        let value = serde_json::to_value(request).unwrap();
        assert!(value.get("filterGroups").is_none());
        assert_eq!(value["sorts"][0]["propertyName"], "lastmodifieddate");
    }

    #[test]
    fn contact_timestamp_falls_back_to_lastmodifieddate() {
        let object: CrmObject = serde_json::from_value(json!({
            "id": "51",
            "properties": { "email": "a@b.c", "lastmodifieddate": "2024-03-01T10:00:00Z" }
        }))
        .unwrap();
        let fallback = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let contact = object.into_contact("62515", fallback);
        assert_eq!(contact.updated_at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert_eq!(contact.portal_id, "62515");
    }
}
