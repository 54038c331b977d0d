//! # Atrium REST
//!
//! Host-routed HTTP API over tenant-isolated entity stores.
//!
//! Every request is routed by its `Host` header. Hosts bound to a tenant
//! reach that tenant's entity routes; central hosts reach the registry
//! administration routes. Neither kind of host can use the other's routes.
//!
//! ## Tenant routes
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/{entity}` | List visible records |
//! | POST | `/{entity}` | Create a record |
//! | GET | `/{entity}/trash` | List the trash bin |
//! | GET | `/{entity}/{id}` | Read a visible record |
//! | DELETE | `/{entity}/{id}` | Move to trash (`?reason=`) |
//! | PUT | `/{entity}/{id}/restore` | Restore from trash |
//! | DELETE | `/{entity}/{id}/force` | Permanently delete a trashed record |
//! | PUT | `/{entity}/{id}/hide` | Hide |
//! | PUT | `/{entity}/{id}/unhide` | Unhide |
//!
//! Lifecycle operations need the acting user in `X-Actor-Id`. The client
//! address for audit stamps comes from `X-Forwarded-For` or `X-Real-IP`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use atrium_rest::{AppState, ServerConfig, create_app, init_logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env();
//!     init_logging(&config.log_level);
//!
//!     let state = AppState::open(&config).await?;
//!     let app = create_app(state);
//!
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routing;
pub mod state;

pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application from prepared state.
///
/// The middleware stack (tracing, timeout, body limit, request ids and
/// CORS) is configured from the state's [`ServerConfig`].
pub fn create_app(state: AppState) -> Router {
    let config = state.config().clone();
    info!(
        entities = state.catalog().len(),
        central_domains = %config.central_domains,
        "Creating Atrium REST API"
    );

    let router = routing::create_routes(state);

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout),
        ));

    let router = router.layer(DefaultBodyLimit::max(config.max_body_size));

    // Request ids are set before the handlers read them and echoed after.
    let router = if config.enable_request_id {
        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    } else {
        router
    };

    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// Call once at startup. `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "atrium_rest={level},atrium_persistence={level},atrium={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
