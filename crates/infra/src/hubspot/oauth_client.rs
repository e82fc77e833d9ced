//! HubSpot OAuth endpoints

use std::time::Duration;

use async_trait::async_trait;
use hubsync_core::OAuthProvider;
use hubsync_domain::{HubSpotConfig, HubSyncError, Result, TokenGrant, TokenInfo};
use reqwest::{Method, Response, StatusCode};
use tracing::{debug, instrument, warn};

use super::types::{AccessTokenInfo, OAuthErrorBody, TokenResponse};
use crate::errors::{from_status, into_domain};
use crate::http::HttpClient;

/// [`OAuthProvider`] backed by `POST /oauth/v1/token` and
/// `GET /oauth/v1/access-tokens/{token}`.
#[derive(Clone)]
pub struct HubSpotOAuthClient {
    http: HttpClient,
    api_base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl HubSpotOAuthClient {
    /// Create a client with its own HTTP connection pool
    pub fn new(config: &HubSpotConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_http(config, http))
    }

    /// Create a client on an existing HTTP client
    pub fn with_http(config: &HubSpotConfig, http: HttpClient) -> Self {
        Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant> {
        let url = format!("{}/oauth/v1/token", self.api_base_url);
        let request = self.http.request(Method::POST, url).form(form);
        let response = self.http.send(request).await?;

        if response.status().is_success() {
            let body: TokenResponse = response.json().await.map_err(into_domain)?;
            return Ok(body.into());
        }

        Err(token_endpoint_error(response).await)
    }
}

/// 400/401 from the token endpoint mean the grant itself was refused.
async fn token_endpoint_error(response: Response) -> HubSyncError {
    let status = response.status();
    let body: OAuthErrorBody = response.json().await.unwrap_or_default();

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
            warn!(%status, reason = %body.summary(), "token grant rejected");
            HubSyncError::Refresh(body.summary())
        }
        other => {
            warn!(status = %other, "token endpoint failed");
            from_status(other.as_u16(), other.canonical_reason())
        }
    }
}

#[async_trait]
impl OAuthProvider for HubSpotOAuthClient {
    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        debug!("exchanging authorization code");
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code),
        ])
        .await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        debug!("refreshing access token");
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    #[instrument(skip_all)]
    async fn token_info(&self, access_token: &str) -> Result<TokenInfo> {
        let url = format!(
            "{}/oauth/v1/access-tokens/{}",
            self.api_base_url,
            urlencoding::encode(access_token)
        );
        let response = self.http.send(self.http.request(Method::GET, url)).await?;
        let status = response.status();

        if status.is_success() {
            let info: AccessTokenInfo = response.json().await.map_err(into_domain)?;
            debug!(hub_id = info.hub_id, "resolved token owner");
            return Ok(info.into());
        }

        match status {
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => {
                Err(HubSyncError::Refresh("access token not recognized".into()))
            }
            other => Err(from_status(other.as_u16(), other.canonical_reason())),
        }
    }
}
