//! Central administration handlers for the tenant registry.
//!
//! Every handler takes a [`CentralHost`], so these routes answer only on
//! central domains and reject tenant hosts with 403.

use atrium_persistence::error::TenantError;
use atrium_persistence::tenant::{CentralRegistry, NewTenant, TenantId};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::RestResult;
use crate::extractors::CentralHost;
use crate::state::AppState;

/// Body of `PUT /tenants/{id}/active`.
#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    /// Whether the tenant may serve requests.
    pub active: bool,
}

/// Body of `POST /tenants/{id}/domains`.
#[derive(Debug, Deserialize)]
pub struct DomainRequest {
    /// Host name to bind to the tenant.
    pub domain: String,
}

/// Lists every tenant.
///
/// `GET /tenants`
pub async fn list_tenants_handler(
    State(state): State<AppState>,
    CentralHost(host): CentralHost,
) -> RestResult<Response> {
    debug!(host = %host, "Processing tenant list request");

    let tenants = state.registry().list_tenants().await?;
    Ok((StatusCode::OK, Json(tenants)).into_response())
}

/// Registers a tenant and provisions its store.
///
/// # HTTP Request
///
/// `POST /tenants` with `{"id", "name", "domains", "config"?}`
///
/// # Response
///
/// - `201 Created` - The registered tenant
/// - `400 Bad Request` - Invalid id or domain, or no domains
/// - `409 Conflict` - Id or domain already taken
///
/// Registration commits before the store is provisioned. If provisioning
/// fails the error is returned, the tenant stays registered, and its
/// requests answer 503 until `PUT /tenants/{id}/active` with
/// `{"active": true}` provisions the store again.
pub async fn create_tenant_handler(
    State(state): State<AppState>,
    CentralHost(host): CentralHost,
    Json(request): Json<NewTenant>,
) -> RestResult<Response> {
    debug!(host = %host, tenant = %request.id, "Processing tenant registration");

    let tenant = state.registry().create_tenant(request).await?;
    if let Err(e) = state.router().provision(&tenant) {
        error!(
            tenant = %tenant.id,
            error = %e,
            "Tenant registered but its store could not be provisioned"
        );
        return Err(e.into());
    }
    info!(tenant = %tenant.id, domains = ?tenant.domains, "Tenant registered and provisioned");

    let location = format!("/tenants/{}", tenant.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(tenant),
    )
        .into_response())
}

/// Reads a tenant.
///
/// `GET /tenants/{id}`
pub async fn get_tenant_handler(
    State(state): State<AppState>,
    CentralHost(_host): CentralHost,
    Path(id): Path<String>,
) -> RestResult<Response> {
    let tenant_id = TenantId::new(id);
    let tenant = state.registry().get_tenant(&tenant_id).await?;
    let tenant = tenant.ok_or(TenantError::UnknownTenant { tenant_id })?;

    Ok((StatusCode::OK, Json(tenant)).into_response())
}

/// Activates or suspends a tenant.
///
/// Requests resolved after this call see the new state. Activation also
/// provisions the tenant's store, creating it if it is missing and adding
/// tables for entity types new to the catalog.
///
/// `PUT /tenants/{id}/active` with `{"active": bool}`
pub async fn set_active_handler(
    State(state): State<AppState>,
    CentralHost(_host): CentralHost,
    Path(id): Path<String>,
    Json(request): Json<ActiveRequest>,
) -> RestResult<Response> {
    let tenant = state
        .registry()
        .set_active(&TenantId::new(id), request.active)
        .await?;
    if tenant.active {
        state.router().provision(&tenant)?;
    }
    info!(tenant = %tenant.id, active = tenant.active, "Tenant activation changed");

    Ok((StatusCode::OK, Json(tenant)).into_response())
}

/// Binds another domain to a tenant.
///
/// `POST /tenants/{id}/domains` with `{"domain": "..."}`
pub async fn attach_domain_handler(
    State(state): State<AppState>,
    CentralHost(_host): CentralHost,
    Path(id): Path<String>,
    Json(request): Json<DomainRequest>,
) -> RestResult<Response> {
    let tenant = state
        .registry()
        .attach_domain(&TenantId::new(id), &request.domain)
        .await?;

    Ok((StatusCode::OK, Json(tenant)).into_response())
}

/// Unbinds a domain from a tenant.
///
/// `DELETE /tenants/{id}/domains/{domain}`
pub async fn detach_domain_handler(
    State(state): State<AppState>,
    CentralHost(_host): CentralHost,
    Path((id, domain)): Path<(String, String)>,
) -> RestResult<Response> {
    let tenant = state
        .registry()
        .detach_domain(&TenantId::new(id), &domain)
        .await?;

    Ok((StatusCode::OK, Json(tenant)).into_response())
}
