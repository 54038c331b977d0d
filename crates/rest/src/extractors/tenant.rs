//! Tenant and central host extractors.
//!
//! [`TenantScope`] is the only way a handler reaches a tenant store: it
//! resolves the request host, rejects central and suspended hosts, and binds
//! a [`ScopedContext`] that is released when the handler returns.

use atrium_persistence::backends::sqlite::ScopedContext;
use atrium_persistence::tenant::{RequestMetadata, Tenant};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, request::Parts},
};
use tracing::{debug, warn};

use super::host::RequestHost;
use crate::error::RestError;
use crate::state::AppState;

/// Client address as reported by the edge proxy.
pub static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Correlation id header.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Builds the audit metadata for a request from its headers.
///
/// The client ip is the first `X-Forwarded-For` entry, else `X-Real-IP`.
pub fn request_metadata(headers: &HeaderMap) -> RequestMetadata {
    let header = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let ip = header(&X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header(&X_REAL_IP));

    let mut metadata = RequestMetadata::new();
    if let Some(ip) = ip {
        metadata = metadata.with_ip(ip);
    }
    if let Some(id) = header(&X_REQUEST_ID) {
        metadata = metadata.with_correlation_id(id);
    }
    metadata
}

/// A request bound to its tenant's store.
pub struct TenantScope {
    /// Snapshot of the resolved tenant.
    pub tenant: Tenant,
    /// The bound store.
    pub store: ScopedContext,
}

impl std::fmt::Debug for TenantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantScope")
            .field("tenant", &self.tenant.id)
            .finish_non_exhaustive()
    }
}

impl FromRequestParts<AppState> for TenantScope {
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequestHost(host) = RequestHost::from_request_parts(parts, state).await?;

        let tenant = state
            .resolver()
            .resolve_tenant(&host)
            .await
            .map_err(|e| {
                warn!(host = %host, error = %e, "Tenant route rejected");
                e
            })?;

        let store = state
            .router()
            .bind(&tenant, request_metadata(&parts.headers))?;
        debug!(tenant = %tenant.id, host = %host, "Bound tenant store");

        Ok(Self { tenant, store })
    }
}

/// A request addressed to a central (administrative) host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralHost(pub String);

impl FromRequestParts<AppState> for CentralHost {
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequestHost(host) = RequestHost::from_request_parts(parts, state).await?;

        let central = state
            .resolver()
            .resolve_central(&host)
            .await
            .map_err(|e| {
                warn!(host = %host, error = %e, "Central route rejected");
                e
            })?;
        Ok(CentralHost(central))
    }
}
