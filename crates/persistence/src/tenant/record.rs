//! Tenant records held by the central registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::TenantId;

/// A tenant as stored in the central registry.
///
/// Resolution hands out owned snapshots of this record, so a registry change
/// only affects requests resolved after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Stable slug; also the basis of the tenant's store name.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Normalized host names bound to this tenant.
    pub domains: Vec<String>,
    /// Opaque tenant configuration.
    #[serde(default)]
    pub config: Value,
    /// Inactive tenants resolve to [`TenantSuspended`](crate::error::TenantError::TenantSuspended).
    pub active: bool,
    /// When the tenant was registered.
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Returns `true` if `domain` (already normalized) is bound to this tenant.
    pub fn owns_domain(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d == domain)
    }
}

/// Input for registering a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTenant {
    /// Requested slug.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Initial domains; registration needs at least one.
    #[serde(default)]
    pub domains: Vec<String>,
    /// Opaque tenant configuration.
    #[serde(default)]
    pub config: Value,
}

impl NewTenant {
    /// Creates a registration request with empty config.
    ///
    /// Add at least one domain with [`with_domain`](Self::with_domain) before
    /// registering it.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(id),
            name: name.into(),
            domains: Vec::new(),
            config: Value::Object(Default::default()),
        }
    }

    /// Adds a domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into());
        self
    }

    /// Sets the tenant configuration.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

/// What a normalized domain is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainBinding {
    /// The domain belongs to a tenant.
    Tenant(Tenant),
    /// The domain serves central administration only.
    Central,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_tenant_builder() {
        let tenant = NewTenant::new("acme", "Acme Corp")
            .with_domain("acme.example.com")
            .with_domain("crm.acme.test")
            .with_config(json!({"locale": "pt-BR"}));

        assert_eq!(tenant.id.as_str(), "acme");
        assert_eq!(tenant.domains.len(), 2);
        assert_eq!(tenant.config["locale"], "pt-BR");
    }

    #[test]
    fn test_tenant_serialization_shape() {
        let tenant = Tenant {
            id: TenantId::new("acme"),
            name: "Acme".to_string(),
            domains: vec!["acme.example.com".to_string()],
            config: json!({}),
            active: true,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&tenant).unwrap();
        assert_eq!(value["id"], "acme");
        assert_eq!(value["domains"][0], "acme.example.com");
        assert_eq!(value["active"], true);
        assert!(tenant.owns_domain("acme.example.com"));
        assert!(!tenant.owns_domain("other.example.com"));
    }
}
