//! Entity listing, creation and read handlers.
//!
//! All of them run against the tenant store bound by [`TenantScope`] and
//! read through the `Default` lifecycle scope: hidden and trashed records
//! are invisible here.

use atrium_persistence::StorageError;
use atrium_persistence::core::EntityStore;
use atrium_persistence::lifecycle::EntityLifecycleScope;
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::{PageParams, TenantScope};
use crate::state::AppState;

/// Lists visible records of an entity type.
///
/// # HTTP Request
///
/// `GET /{entity}?offset=&limit=`
///
/// # Response
///
/// - `200 OK` - A page `{items, total, offset, limit, has_more}`
/// - `404 Not Found` - Unknown entity type
pub async fn list_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    mut scope: TenantScope,
    PageParams(page): PageParams,
) -> RestResult<Response> {
    debug!(
        entity = %entity,
        tenant = %scope.tenant.id,
        offset = page.offset,
        limit = page.limit,
        "Processing list request"
    );

    let manager = state.manager(&entity)?;
    let records = scope
        .store
        .list(manager.definition(), EntityLifecycleScope::Default, page)
        .await?;

    Ok((StatusCode::OK, Json(records)).into_response())
}

/// Creates a record.
///
/// A string `id` in the body is used as the record id; otherwise one is
/// generated.
///
/// # HTTP Request
///
/// `POST /{entity}` with a JSON object body
///
/// # Response
///
/// - `201 Created` - The stored record, with a `Location` header
/// - `400 Bad Request` - Body is not a JSON object
/// - `409 Conflict` - A record with this id already exists
pub async fn create_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    mut scope: TenantScope,
    Json(data): Json<Value>,
) -> RestResult<Response> {
    debug!(entity = %entity, tenant = %scope.tenant.id, "Processing create request");

    let manager = state.manager(&entity)?;
    let record = scope.store.insert(manager.definition(), data).await?;

    debug!(entity = %entity, id = %record.id, "Record created");

    let location = format!("/{}/{}", entity, record.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(record),
    )
        .into_response())
}

/// Reads a visible record.
///
/// # HTTP Request
///
/// `GET /{entity}/{id}`
///
/// # Response
///
/// - `200 OK` - The record
/// - `404 Not Found` - Missing, hidden or trashed
pub async fn read_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    mut scope: TenantScope,
) -> RestResult<Response> {
    debug!(entity = %entity, id = %id, tenant = %scope.tenant.id, "Processing read request");

    let manager = state.manager(&entity)?;
    let record = scope
        .store
        .fetch(manager.definition(), &id, EntityLifecycleScope::Default)
        .await?
        .ok_or_else(|| StorageError::not_found(&entity, &id))?;

    Ok((StatusCode::OK, Json(record)).into_response())
}
