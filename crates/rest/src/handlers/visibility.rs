//! Hide and unhide handlers.

use atrium_persistence::lifecycle::SoftDeletable;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::{Actor, TenantScope};
use crate::state::AppState;

/// Hides a record from normal listings.
///
/// `PUT /{entity}/{id}/hide` with `X-Actor-Id`
pub async fn hide_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    mut scope: TenantScope,
    actor: Actor,
) -> RestResult<Response> {
    debug!(entity = %entity, id = %id, tenant = %scope.tenant.id, "Processing hide request");

    let manager = state.manager(&entity)?;
    let record = manager.hide(&mut scope.store, &id, actor.as_deref()).await?;

    Ok((StatusCode::OK, Json(record)).into_response())
}

/// Makes a hidden record visible again.
///
/// `PUT /{entity}/{id}/unhide` with `X-Actor-Id`
pub async fn unhide_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    mut scope: TenantScope,
    actor: Actor,
) -> RestResult<Response> {
    debug!(entity = %entity, id = %id, tenant = %scope.tenant.id, "Processing unhide request");

    let manager = state.manager(&entity)?;
    let record = manager
        .unhide(&mut scope.store, &id, actor.as_deref())
        .await?;

    Ok((StatusCode::OK, Json(record)).into_response())
}
