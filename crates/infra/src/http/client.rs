use std::time::Duration;

use hubsync_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use hubsync_domain::HubSyncError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::into_domain;

const DEFAULT_USER_AGENT: &str = concat!("hubsync/", env!("CARGO_PKG_VERSION"));

/// HTTP client with a bounded per-request timeout.
///
/// Requests are sent exactly once. Callers decide whether a failure is worth
/// another attempt.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, HubSyncError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the request once. Non-2xx responses are returned as-is.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, HubSyncError> {
        let request = builder.build().map_err(into_domain)?;

        let method = request.method().clone();
        // Paths can carry access tokens (introspection); log the route only.
        let host = request.url().host_str().unwrap_or_default().to_string();
        let route = redacted_path(request.url().path());
        debug!(%method, %host, %route, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %host, %route, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %host, %route, error = %err, "HTTP request failed");
                Err(into_domain(err))
            }
        }
    }
}

fn redacted_path(path: &str) -> String {
    match path.strip_prefix("/oauth/v1/access-tokens/") {
        Some(_) => "/oauth/v1/access-tokens/[REDACTED]".to_string(),
        None => path.to_string(),
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: String,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, HubSyncError> {
        if self.timeout.is_zero() {
            return Err(HubSyncError::Config("HTTP timeout must be greater than zero".into()));
        }

        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).user_agent(self.user_agent).no_proxy();

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(into_domain)?;

        Ok(HttpClient { client })
    }
}
