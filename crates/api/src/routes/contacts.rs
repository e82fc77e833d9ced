use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use hubsync_domain::constants::DEFAULT_SEARCH_LIMIT;
use hubsync_domain::{ContactRecord, SyncReport};
use serde::Deserialize;
use tracing::warn;

use super::{connected_portal, UserId};
use crate::error::ApiError;
use crate::AppContext;

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

pub(super) async fn search(
    State(ctx): State<Arc<AppContext>>,
    user: UserId,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ContactRecord>>, ApiError> {
    let portal_id = connected_portal(&ctx, &user).await?;
    let outcome = ctx
        .search
        .search_detailed(&portal_id, &params.q, params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        .await?;

    if let Some(err) = outcome.remote_error.as_ref().filter(|err| err.requires_reconnect()) {
        warn!(%portal_id, error = %err, "served cached contacts; portal needs reconnect");
    }
    Ok(Json(outcome.records))
}

pub(super) async fn sync(
    State(ctx): State<Arc<AppContext>>,
    user: UserId,
) -> Result<Json<SyncReport>, ApiError> {
    let portal_id = connected_portal(&ctx, &user).await?;
    let report = ctx.poller.pull_from_saved_cursor(&portal_id).await?;
    Ok(Json(report))
}
