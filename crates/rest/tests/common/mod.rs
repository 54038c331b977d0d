//! REST API test harness.
//!
//! Every harness runs the full application (middleware included) against
//! private in-memory stores, with a fixed audit clock.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, header::HOST};
use axum_test::{TestRequest, TestServer};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use atrium_persistence::lifecycle::{AuditTrailRecorder, FixedClock};
use atrium_persistence::tenant::{NewTenant, Tenant};
use atrium_rest::extractors::X_ACTOR_ID;
use atrium_rest::{AppState, ServerConfig, create_app};

/// The central host of [`ServerConfig::for_testing`].
pub const CENTRAL_HOST: &str = "admin.localhost";

/// The moment every audit stamp carries.
pub fn frozen_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap()
}

/// The host bound to a tenant registered by [`TestApp::tenant`].
pub fn tenant_host(id: &str) -> String {
    format!("{id}.example.com")
}

/// A running application and its state.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(ServerConfig::for_testing()).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let state = AppState::open(&config)
            .await
            .expect("Failed to open stores")
            .with_recorder(AuditTrailRecorder::new(Arc::new(FixedClock(frozen_now()))));
        let server = TestServer::new(create_app(state.clone())).expect("Failed to create test server");
        Self { server, state }
    }

    /// Registers and provisions a tenant serving `<id>.example.com`.
    pub async fn tenant(&self, id: &str) -> Tenant {
        let tenant = self
            .state
            .registry()
            .create_tenant(NewTenant::new(id, id).with_domain(tenant_host(id)))
            .await
            .expect("Failed to register tenant");
        self.state
            .router()
            .provision(&tenant)
            .expect("Failed to provision tenant");
        tenant
    }

    pub fn get(&self, host: &str, path: &str) -> TestRequest {
        with_host(self.server.get(path), host)
    }

    pub fn post(&self, host: &str, path: &str) -> TestRequest {
        with_host(self.server.post(path), host)
    }

    pub fn put(&self, host: &str, path: &str) -> TestRequest {
        with_host(self.server.put(path), host)
    }

    pub fn delete(&self, host: &str, path: &str) -> TestRequest {
        with_host(self.server.delete(path), host)
    }

    /// Creates a record through the API and returns its id.
    pub async fn create(&self, host: &str, entity: &str, body: Value) -> String {
        let response = self
            .post(host, &format!("/{entity}"))
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let record: Value = response.json();
        record["id"].as_str().expect("record id").to_string()
    }

    /// Creates a `clients` record named `name`.
    pub async fn client(&self, host: &str, name: &str) -> String {
        self.create(host, "clients", json!({ "nome": name })).await
    }
}

fn with_host(request: TestRequest, host: &str) -> TestRequest {
    request.add_header(HOST, HeaderValue::from_str(host).expect("valid host"))
}

/// Adds `X-Actor-Id`.
pub fn as_actor(request: TestRequest, actor: &'static str) -> TestRequest {
    request.add_header(X_ACTOR_ID.clone(), HeaderValue::from_static(actor))
}

/// Adds an arbitrary static header.
pub fn with_header(
    request: TestRequest,
    name: &'static str,
    value: &'static str,
) -> TestRequest {
    request.add_header(
        HeaderName::from_static(name),
        HeaderValue::from_static(value),
    )
}
