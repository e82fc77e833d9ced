//! HTTP routes
//!
//! Handlers are thin: they pull the caller's user id from `x-user-id`, call
//! one service on [`AppContext`] and map the result.

mod contacts;
mod oauth;
mod webhooks;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::{any, delete, get, post};
use axum::Router;
use hubsync_domain::HubSyncError;

use crate::error::ApiError;
use crate::AppContext;

/// Header carrying the authenticated app user.
pub const USER_ID_HEADER: &str = "x-user-id";

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/hubspot", any(webhooks::receive))
        .route("/hubspot/connect", get(oauth::connect))
        .route("/hubspot/callback", get(oauth::callback))
        .route("/hubspot/status", get(oauth::status))
        .route("/hubspot/connection", delete(oauth::disconnect))
        .route("/hubspot/contacts/search", get(contacts::search))
        .route("/hubspot/sync", post(contacts::sync))
        .with_state(ctx)
}

async fn health() -> &'static str {
    "ok"
}

/// App user the request acts for.
#[derive(Debug, Clone)]
pub struct UserId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .ok_or_else(|| {
                ApiError(HubSyncError::InvalidInput(format!("{USER_ID_HEADER} header required")))
            })
    }
}

/// Portal the user connected, or `TokenFetch` when there is none.
async fn connected_portal(ctx: &AppContext, user: &UserId) -> Result<String, ApiError> {
    ctx.tokens
        .portal_for_user(&user.0)
        .await?
        .ok_or_else(|| ApiError(HubSyncError::TokenFetch(format!("user {}", user.0))))
}
