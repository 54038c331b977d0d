//! Trash bin handlers.

use atrium_persistence::core::EntityStore;
use atrium_persistence::lifecycle::{EntityLifecycleScope, Trashable};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::{Actor, PageParams, TenantScope};
use crate::state::AppState;

/// Query parameters of a move to the trash.
#[derive(Debug, Default, Deserialize)]
pub struct TrashQuery {
    /// Optional reason, recorded in the audit stamp.
    pub reason: Option<String>,
}

/// Lists the trash bin of an entity type.
///
/// Trashed records are listed whether or not they are also hidden.
///
/// # HTTP Request
///
/// `GET /{entity}/trash?offset=&limit=`
pub async fn trash_list_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    mut scope: TenantScope,
    PageParams(page): PageParams,
) -> RestResult<Response> {
    debug!(entity = %entity, tenant = %scope.tenant.id, "Processing trash list request");

    let manager = state.manager(&entity)?;
    let records = scope
        .store
        .list(manager.definition(), EntityLifecycleScope::TrashOnly, page)
        .await?;

    Ok((StatusCode::OK, Json(records)).into_response())
}

/// Moves a record to the trash.
///
/// # HTTP Request
///
/// `DELETE /{entity}/{id}?reason=` with `X-Actor-Id`
///
/// # Response
///
/// - `200 OK` - The trashed record (also when it already was)
/// - `400 Bad Request` - No acting user
/// - `404 Not Found` - No such record
/// - `409 Conflict` - The entity type has no trash bin
pub async fn move_to_trash_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    mut scope: TenantScope,
    actor: Actor,
    Query(query): Query<TrashQuery>,
) -> RestResult<Response> {
    debug!(
        entity = %entity,
        id = %id,
        tenant = %scope.tenant.id,
        actor = ?actor.as_deref(),
        "Processing move to trash request"
    );

    let manager = state.manager(&entity)?;
    let record = manager
        .move_to_trash(
            &mut scope.store,
            &id,
            actor.as_deref(),
            query.reason.as_deref(),
        )
        .await?;

    Ok((StatusCode::OK, Json(record)).into_response())
}

/// Restores a trashed record.
///
/// # HTTP Request
///
/// `PUT /{entity}/{id}/restore` with `X-Actor-Id`
///
/// # Response
///
/// - `200 OK` - The restored record
/// - `409 Conflict` - The record is not in the trash
pub async fn restore_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    mut scope: TenantScope,
    actor: Actor,
) -> RestResult<Response> {
    debug!(entity = %entity, id = %id, tenant = %scope.tenant.id, "Processing restore request");

    let manager = state.manager(&entity)?;
    let record = manager
        .restore(&mut scope.store, &id, actor.as_deref())
        .await?;

    Ok((StatusCode::OK, Json(record)).into_response())
}

/// Permanently deletes a trashed record.
///
/// # HTTP Request
///
/// `DELETE /{entity}/{id}/force` with `X-Actor-Id`
///
/// # Response
///
/// - `204 No Content` - The record is gone
/// - `409 Conflict` - The record is not in the trash
pub async fn force_delete_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    mut scope: TenantScope,
    actor: Actor,
) -> RestResult<Response> {
    debug!(entity = %entity, id = %id, tenant = %scope.tenant.id, "Processing force delete request");

    let manager = state.manager(&entity)?;
    manager
        .force_delete(&mut scope.store, &id, actor.as_deref())
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
