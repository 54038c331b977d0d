//! Route table.

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::handlers;
use crate::state::AppState;

/// Creates all routes.
///
/// Static segments take priority over `{entity}`, so `tenants` and `health`
/// are not usable as entity names.
///
/// # Routes
///
/// ## Any host
/// - `GET /health` - Health check
///
/// ## Central hosts
/// - `GET /tenants`, `POST /tenants` - List and register tenants
/// - `GET /tenants/{id}` - Read a tenant
/// - `PUT /tenants/{id}/active` - Activate or suspend
/// - `POST /tenants/{id}/domains` - Attach a domain
/// - `DELETE /tenants/{id}/domains/{domain}` - Detach a domain
///
/// ## Tenant hosts
/// - `GET /{entity}`, `POST /{entity}` - List visible records, create
/// - `GET /{entity}/trash` - List the trash bin
/// - `GET /{entity}/{id}` - Read a visible record
/// - `DELETE /{entity}/{id}` - Move to trash
/// - `PUT /{entity}/{id}/restore` - Restore from trash
/// - `DELETE /{entity}/{id}/force` - Permanently delete a trashed record
/// - `PUT /{entity}/{id}/hide`, `PUT /{entity}/{id}/unhide` - Toggle visibility
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        // Central administration
        .route(
            "/tenants",
            get(handlers::list_tenants_handler).post(handlers::create_tenant_handler),
        )
        .route("/tenants/{id}", get(handlers::get_tenant_handler))
        .route("/tenants/{id}/active", put(handlers::set_active_handler))
        .route("/tenants/{id}/domains", post(handlers::attach_domain_handler))
        .route(
            "/tenants/{id}/domains/{domain}",
            delete(handlers::detach_domain_handler),
        )
        // Entity collections
        .route(
            "/{entity}",
            get(handlers::list_handler).post(handlers::create_handler),
        )
        .route("/{entity}/trash", get(handlers::trash_list_handler))
        // Entity instances
        .route(
            "/{entity}/{id}",
            get(handlers::read_handler).delete(handlers::move_to_trash_handler),
        )
        .route("/{entity}/{id}/restore", put(handlers::restore_handler))
        .route("/{entity}/{id}/force", delete(handlers::force_delete_handler))
        .route("/{entity}/{id}/hide", put(handlers::hide_handler))
        .route("/{entity}/{id}/unhide", put(handlers::unhide_handler))
        .with_state(state)
}
