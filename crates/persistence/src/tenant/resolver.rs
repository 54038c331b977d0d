//! Host-based tenant resolution.
//!
//! [`TenantResolver`] maps the host of an inbound request to the tenant that
//! owns it, or recognizes it as a central domain. For a fixed registry state
//! the mapping is deterministic.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{StorageResult, TenantError};

use super::record::{DomainBinding, Tenant};
use super::registry::CentralRegistry;

/// Normalizes a request host for domain matching.
///
/// Trims whitespace, lowercases, drops a `:port` suffix and a trailing dot.
/// Bracketed IPv6 literals keep their brackets. Returns `None` for an empty
/// host.
///
/// ```
/// use atrium_persistence::tenant::normalize_host;
///
/// assert_eq!(normalize_host("Acme.Example.com:8080").as_deref(), Some("acme.example.com"));
/// assert_eq!(normalize_host("acme.example.com.").as_deref(), Some("acme.example.com"));
/// assert_eq!(normalize_host("[::1]:3000").as_deref(), Some("[::1]"));
/// assert_eq!(normalize_host("  "), None);
/// ```
pub fn normalize_host(host: &str) -> Option<String> {
    let host = host.trim().to_ascii_lowercase();

    let host = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => host[..=end].to_string(),
            None => host,
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
            _ => host,
        }
    };

    let host = host.trim_end_matches('.');
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// The outcome of resolving a host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostResolution {
    /// The host belongs to an active tenant.
    Tenant(Tenant),
    /// The host is a central domain.
    Central {
        /// The normalized host.
        host: String,
    },
}

/// Resolves request hosts against the central registry.
#[derive(Clone)]
pub struct TenantResolver {
    registry: Arc<dyn CentralRegistry>,
}

impl fmt::Debug for TenantResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantResolver").finish_non_exhaustive()
    }
}

impl TenantResolver {
    /// Creates a resolver backed by the given registry.
    pub fn new(registry: Arc<dyn CentralRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &Arc<dyn CentralRegistry> {
        &self.registry
    }

    /// Resolves a host to a tenant or a central domain.
    ///
    /// # Errors
    ///
    /// - `NotResolved` if the host matches no registered domain
    /// - `TenantSuspended` if the owning tenant is inactive
    pub async fn resolve(&self, host: &str) -> StorageResult<HostResolution> {
        let normalized = normalize_host(host).ok_or_else(|| TenantError::NotResolved {
            host: host.to_string(),
        })?;

        match self.registry.find_domain(&normalized).await? {
            None => {
                debug!(host = %normalized, "Host matches no registered domain");
                Err(TenantError::NotResolved { host: normalized }.into())
            }
            Some(DomainBinding::Central) => Ok(HostResolution::Central { host: normalized }),
            Some(DomainBinding::Tenant(tenant)) if !tenant.active => {
                warn!(host = %normalized, tenant_id = %tenant.id, "Request for suspended tenant");
                Err(TenantError::TenantSuspended {
                    tenant_id: tenant.id,
                }
                .into())
            }
            Some(DomainBinding::Tenant(tenant)) => {
                debug!(host = %normalized, tenant_id = %tenant.id, "Resolved tenant from host");
                Ok(HostResolution::Tenant(tenant))
            }
        }
    }

    /// Resolves a host that must belong to a tenant.
    ///
    /// Central domains are rejected with `CentralDomainAccessDenied`, before
    /// any store binding is attempted.
    pub async fn resolve_tenant(&self, host: &str) -> StorageResult<Tenant> {
        match self.resolve(host).await? {
            HostResolution::Tenant(tenant) => Ok(tenant),
            HostResolution::Central { host } => {
                warn!(host = %host, "Tenant route reached through central domain");
                Err(TenantError::CentralDomainAccessDenied { host }.into())
            }
        }
    }

    /// Checks that a host is a central domain.
    pub async fn resolve_central(&self, host: &str) -> StorageResult<String> {
        match self.resolve(host).await? {
            HostResolution::Central { host } => Ok(host),
            HostResolution::Tenant(tenant) => {
                warn!(tenant_id = %tenant.id, "Central route reached through tenant domain");
                Err(TenantError::CentralRouteDenied {
                    host: normalize_host(host).unwrap_or_default(),
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::RwLock;

    use super::*;
    use crate::error::StorageError;
    use crate::tenant::{NewTenant, TenantId};

    /// Minimal map-backed registry for resolver tests.
    #[derive(Default)]
    struct MapRegistry {
        tenants: RwLock<HashMap<String, Tenant>>,
        central: RwLock<Vec<String>>,
    }

    impl MapRegistry {
        fn with_tenant(self, id: &str, domain: &str, active: bool) -> Self {
            self.tenants.write().insert(
                id.to_string(),
                Tenant {
                    id: TenantId::new(id),
                    name: id.to_string(),
                    domains: vec![domain.to_string()],
                    config: serde_json::json!({}),
                    active,
                    created_at: Utc::now(),
                },
            );
            self
        }

        fn with_central(self, domain: &str) -> Self {
            self.central.write().push(domain.to_string());
            self
        }
    }

    #[async_trait]
    impl CentralRegistry for MapRegistry {
        async fn create_tenant(&self, _tenant: NewTenant) -> StorageResult<Tenant> {
            unimplemented!()
        }
        async fn get_tenant(&self, id: &TenantId) -> StorageResult<Option<Tenant>> {
            Ok(self.tenants.read().get(id.as_str()).cloned())
        }
        async fn list_tenants(&self) -> StorageResult<Vec<Tenant>> {
            Ok(self.tenants.read().values().cloned().collect())
        }
        async fn set_active(&self, _id: &TenantId, _active: bool) -> StorageResult<Tenant> {
            unimplemented!()
        }
        async fn attach_domain(&self, _id: &TenantId, _domain: &str) -> StorageResult<Tenant> {
            unimplemented!()
        }
        async fn detach_domain(&self, _id: &TenantId, _domain: &str) -> StorageResult<Tenant> {
            unimplemented!()
        }
        async fn designate_central_domain(&self, domain: &str) -> StorageResult<()> {
            self.central.write().push(domain.to_string());
            Ok(())
        }
        async fn central_domains(&self) -> StorageResult<Vec<String>> {
            Ok(self.central.read().clone())
        }
        async fn find_domain(&self, domain: &str) -> StorageResult<Option<DomainBinding>> {
            if self.central.read().iter().any(|d| d == domain) {
                return Ok(Some(DomainBinding::Central));
            }
            Ok(self
                .tenants
                .read()
                .values()
                .find(|t| t.owns_domain(domain))
                .cloned()
                .map(DomainBinding::Tenant))
        }
    }

    fn resolver() -> TenantResolver {
        let registry = MapRegistry::default()
            .with_tenant("acme", "acme.example.com", true)
            .with_tenant("dormant", "dormant.example.com", false)
            .with_central("admin.example.com");
        TenantResolver::new(Arc::new(registry))
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("ACME.example.com").as_deref(), Some("acme.example.com"));
        assert_eq!(normalize_host("acme.example.com:443").as_deref(), Some("acme.example.com"));
        assert_eq!(normalize_host(" acme.example.com. ").as_deref(), Some("acme.example.com"));
        assert_eq!(normalize_host("[2001:db8::1]").as_deref(), Some("[2001:db8::1]"));
        assert_eq!(normalize_host(""), None);
        assert_eq!(normalize_host(":8080"), None);
    }

    #[tokio::test]
    async fn test_resolve_tenant_host() {
        let resolver = resolver();
        let tenant = resolver.resolve_tenant("Acme.Example.com:8080").await.unwrap();
        assert_eq!(tenant.id.as_str(), "acme");
    }

    #[tokio::test]
    async fn test_resolution_is_deterministic() {
        let resolver = resolver();
        let first = resolver.resolve("acme.example.com").await.unwrap();
        let second = resolver.resolve("acme.example.com").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_host_not_resolved() {
        let err = resolver().resolve("nobody.example.com").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Tenant(TenantError::NotResolved { ref host }) if host == "nobody.example.com"
        ));
    }

    #[tokio::test]
    async fn test_central_domain_denied_for_tenant_routes() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("admin.example.com").await.unwrap(),
            HostResolution::Central {
                host: "admin.example.com".to_string()
            }
        );

        let err = resolver.resolve_tenant("admin.example.com").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Tenant(TenantError::CentralDomainAccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_tenant_domain_denied_for_central_routes() {
        let resolver = resolver();
        assert!(resolver.resolve_central("admin.example.com").await.is_ok());

        let err = resolver.resolve_central("acme.example.com").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Tenant(TenantError::CentralRouteDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_inactive_tenant_suspended() {
        let err = resolver().resolve_tenant("dormant.example.com").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Tenant(TenantError::TenantSuspended { .. })
        ));
    }
}
