//! HubSpot CRM contacts search

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_core::ContactsApi;
use hubsync_domain::constants::{CONTACT_PROPERTIES, MAX_SEARCH_LIMIT};
use hubsync_domain::{ContactRecord, HubSpotConfig, Result};
use reqwest::Method;
use tracing::{debug, instrument, warn};

use super::types::{Filter, FilterGroup, SearchRequest, SearchResponse, Sort};
use crate::errors::{from_status, into_domain};
use crate::http::HttpClient;

/// Properties matched by free-text search. `company` is indexed locally but
/// not tokenized remotely.
const REMOTE_SEARCH_PROPERTIES: [&str; 3] = ["firstname", "lastname", "email"];

const LAST_MODIFIED: &str = "lastmodifieddate";

/// [`ContactsApi`] backed by `POST /crm/v3/objects/contacts/search`.
#[derive(Clone)]
pub struct HubSpotContactsClient {
    http: HttpClient,
    api_base_url: String,
}

impl HubSpotContactsClient {
    /// Create a client with its own HTTP connection pool
    pub fn new(config: &HubSpotConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_http(config, http))
    }

    /// Create a client on an existing HTTP client
    pub fn with_http(config: &HubSpotConfig, http: HttpClient) -> Self {
        Self { http, api_base_url: config.api_base_url.trim_end_matches('/').to_string() }
    }

    async fn post_search(
        &self,
        access_token: &str,
        portal_id: &str,
        body: &SearchRequest,
    ) -> Result<Vec<ContactRecord>> {
        let url = format!("{}/crm/v3/objects/contacts/search", self.api_base_url);
        let request =
            self.http.request(Method::POST, url).bearer_auth(access_token).json(body);
        let response = self.http.send(request).await?;
        let status = response.status();

        if !status.is_success() {
            warn!(%status, portal_id, "contacts search failed");
            return Err(from_status(status.as_u16(), status.canonical_reason()));
        }

        let payload: SearchResponse = response.json().await.map_err(into_domain)?;
        let now = Utc::now();
        Ok(payload.results.into_iter().map(|object| object.into_contact(portal_id, now)).collect())
    }
}

fn properties() -> Vec<String> {
    CONTACT_PROPERTIES.iter().map(|p| (*p).to_string()).collect()
}

/// One filter group per property; HubSpot ORs groups together.
fn text_query(query: &str, limit: usize) -> SearchRequest {
    let token = format!("*{}*", query.trim());
    let filter_groups = REMOTE_SEARCH_PROPERTIES
        .iter()
        .map(|property| FilterGroup {
            filters: vec![Filter {
                property_name: (*property).to_string(),
                operator: "CONTAINS_TOKEN",
                value: token.clone(),
            }],
        })
        .collect();

    SearchRequest {
        filter_groups,
        sorts: Vec::new(),
        properties: properties(),
        limit: limit.clamp(1, MAX_SEARCH_LIMIT),
    }
}

fn modified_since_query(since: Option<DateTime<Utc>>, limit: usize) -> SearchRequest {
    let filter_groups = since
        .map(|cursor| {
            vec![FilterGroup {
                filters: vec![Filter {
                    property_name: LAST_MODIFIED.to_string(),
                    operator: "GT",
                    value: cursor.timestamp_millis().to_string(),
                }],
            }]
        })
        .unwrap_or_default();

    SearchRequest {
        filter_groups,
        sorts: vec![Sort { property_name: LAST_MODIFIED.to_string(), direction: "ASCENDING" }],
        properties: properties(),
        limit: limit.clamp(1, MAX_SEARCH_LIMIT),
    }
}

#[async_trait]
impl ContactsApi for HubSpotContactsClient {
    #[instrument(skip(self, access_token, query), fields(query_len = query.len()))]
    async fn search_contacts(
        &self,
        access_token: &str,
        portal_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ContactRecord>> {
        let records = self.post_search(access_token, portal_id, &text_query(query, limit)).await?;
        debug!(count = records.len(), "remote search returned");
        Ok(records)
    }

    #[instrument(skip(self, access_token))]
    async fn contacts_modified_since(
        &self,
        access_token: &str,
        portal_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<ContactRecord>> {
        let records =
            self.post_search(access_token, portal_id, &modified_since_query(since, limit)).await?;
        debug!(count = records.len(), "modified contacts fetched");
        Ok(records)
    }
}
