use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use hubsync_domain::{ConnectionStatus, HubSyncError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::UserId;
use crate::error::ApiError;
use crate::AppContext;

#[derive(Debug, Serialize)]
pub(super) struct ConnectResponse {
    authorization_url: String,
    expires_at: DateTime<Utc>,
}

pub(super) async fn connect(
    State(ctx): State<Arc<AppContext>>,
    user: UserId,
) -> Result<Json<ConnectResponse>, ApiError> {
    let request = ctx.oauth.begin_authorization(&user.0).await?;
    Ok(Json(ConnectResponse { authorization_url: request.url, expires_at: request.expires_at }))
}

#[derive(Debug, Deserialize)]
pub(super) struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CallbackResponse {
    status: ConnectionStatus,
    portal_id: String,
}

pub(super) async fn callback(
    State(ctx): State<Arc<AppContext>>,
    user: UserId,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>, ApiError> {
    if let Some(error) = params.error {
        warn!(%error, "authorization denied by provider");
        return Err(HubSyncError::InvalidState.into());
    }
    let (Some(code), Some(state)) = (params.code, params.state) else {
        return Err(HubSyncError::InvalidState.into());
    };

    let record = ctx.oauth.complete_authorization(&user.0, &code, &state).await?;
    info!(portal_id = %record.portal_id, "portal connected");
    Ok(Json(CallbackResponse { status: ConnectionStatus::Connected, portal_id: record.portal_id }))
}

#[derive(Debug, Serialize)]
pub(super) struct StatusResponse {
    status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    portal_id: Option<String>,
}

pub(super) async fn status(
    State(ctx): State<Arc<AppContext>>,
    user: UserId,
) -> Result<Json<StatusResponse>, ApiError> {
    let Some(portal_id) = ctx.tokens.portal_for_user(&user.0).await? else {
        return Ok(Json(StatusResponse { status: ConnectionStatus::Disconnected, portal_id: None }));
    };
    let status = ctx.tokens.status(&portal_id).await?;
    Ok(Json(StatusResponse { status, portal_id: Some(portal_id) }))
}

pub(super) async fn disconnect(
    State(ctx): State<Arc<AppContext>>,
    user: UserId,
) -> Result<StatusCode, ApiError> {
    if let Some(portal_id) = ctx.tokens.portal_for_user(&user.0).await? {
        ctx.tokens.revoke(&portal_id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
