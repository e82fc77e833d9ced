//! HTTP mapping for `HubSyncError`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hubsync_domain::{ErrorKind, HubSyncError};
use serde_json::json;

/// Wraps a domain error so handlers can use `?`.
#[derive(Debug)]
pub struct ApiError(pub HubSyncError);

impl From<HubSyncError> for ApiError {
    fn from(err: HubSyncError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::NotConnected | ErrorKind::RefreshFailed => StatusCode::CONFLICT,
            ErrorKind::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Rejected => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing error code. Messages for rejected OAuth states and
    /// internal failures are never echoed.
    fn body(&self) -> serde_json::Value {
        match (&self.0, self.0.kind()) {
            (_, ErrorKind::NotConnected | ErrorKind::RefreshFailed) => {
                json!({ "error": "reconnect_required" })
            }
            (HubSyncError::InvalidState, _) => {
                json!({ "error": "authorization_failed" })
            }
            (_, ErrorKind::ProviderUnavailable) => {
                json!({ "error": "provider_unavailable" })
            }
            (err, ErrorKind::Rejected) => {
                json!({ "error": err.label(), "message": err.to_string() })
            }
            (_, ErrorKind::Internal) => json!({ "error": "internal" }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, kind = self.0.label(), "request failed");
        } else {
            tracing::debug!(error = %self.0, kind = self.0.label(), "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_ask_for_reconnect() {
        for err in [HubSyncError::TokenFetch("p1".into()), HubSyncError::Refresh("x".into())] {
            let api = ApiError(err);
            assert_eq!(api.status(), StatusCode::CONFLICT);
            assert_eq!(api.body()["error"], "reconnect_required");
        }
    }

    #[test]
    fn invalid_state_is_generic() {
        let api = ApiError(HubSyncError::InvalidState);
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.body(), json!({ "error": "authorization_failed" }));
    }

    #[test]
    fn transient_and_internal_statuses() {
        assert_eq!(
            ApiError(HubSyncError::ProviderUnavailable("timeout".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let internal = ApiError(HubSyncError::Database("connection reset".into()));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.body(), json!({ "error": "internal" }));
    }
}
