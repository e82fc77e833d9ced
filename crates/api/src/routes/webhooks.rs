use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use hubsync_domain::{HubSpotConfig, WebhookRequest};

use crate::AppContext;

/// Every method is routed here; the ingester answers 405 for non-POST.
pub(super) async fn receive(
    State(ctx): State<Arc<AppContext>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signed_uri = signed_uri(&ctx.config.hubspot, &headers, &uri);
    let request = headers.iter().fold(
        WebhookRequest::new(method.as_str(), signed_uri, body.to_vec()),
        |request, (name, value)| match value.to_str() {
            Ok(value) => request.with_header(name.as_str(), value),
            Err(_) => request,
        },
    );

    let response = ctx.webhooks.handle(&request).await;
    StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Rebuild the absolute URI HubSpot signed. Behind a proxy the request line
/// only carries the path, so the public origin comes from config or `Host`.
fn signed_uri(config: &HubSpotConfig, headers: &HeaderMap, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

    if let Some(base) = config.webhook_base_url.as_deref() {
        return format!("{}{path_and_query}", base.trim_end_matches('/'));
    }
    if uri.scheme().is_some() && uri.authority().is_some() {
        return uri.to_string();
    }
    match headers.get(header::HOST).and_then(|host| host.to_str().ok()) {
        Some(host) => format!("https://{host}{path_and_query}"),
        None => path_and_query.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn config(base: Option<&str>) -> HubSpotConfig {
        let mut config = HubSpotConfig::new("id", "secret", "https://app.example.com/cb");
        config.webhook_base_url = base.map(str::to_string);
        config
    }

    #[test]
    fn configured_origin_wins() {
        let uri: Uri = "/webhooks/hubspot?x=1".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));

        assert_eq!(
            signed_uri(&config(Some("https://hooks.example.com/")), &headers, &uri),
            "https://hooks.example.com/webhooks/hubspot?x=1"
        );
    }

    #[test]
    fn host_header_fallback() {
        let uri: Uri = "/webhooks/hubspot".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("hooks.example.com"));

        assert_eq!(
            signed_uri(&config(None), &headers, &uri),
            "https://hooks.example.com/webhooks/hubspot"
        );
    }
}
