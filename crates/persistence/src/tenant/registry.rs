//! The central registry contract.
//!
//! The central registry is the one store shared by all tenants. It holds
//! tenant records and the domain aliases that route requests to them, and it
//! is never partitioned per tenant.

use async_trait::async_trait;

use crate::error::StorageResult;

use super::id::TenantId;
use super::record::{DomainBinding, NewTenant, Tenant};

/// Storage for tenant records and domain bindings.
///
/// Domain arguments may be passed in any case and with a port; implementations
/// normalize them with [`normalize_host`](super::normalize_host) before
/// storing or matching.
#[async_trait]
pub trait CentralRegistry: Send + Sync {
    /// Registers a tenant with its initial domains.
    ///
    /// Fails with `AlreadyExists` for a duplicate id and `DomainAlreadyAssigned`
    /// if any domain is taken.
    async fn create_tenant(&self, tenant: NewTenant) -> StorageResult<Tenant>;

    /// Looks up a tenant by id.
    async fn get_tenant(&self, id: &TenantId) -> StorageResult<Option<Tenant>>;

    /// Lists all tenants ordered by id.
    async fn list_tenants(&self) -> StorageResult<Vec<Tenant>>;

    /// Activates or deactivates a tenant.
    async fn set_active(&self, id: &TenantId, active: bool) -> StorageResult<Tenant>;

    /// Binds an additional domain to a tenant.
    async fn attach_domain(&self, id: &TenantId, domain: &str) -> StorageResult<Tenant>;

    /// Removes a domain from a tenant.
    async fn detach_domain(&self, id: &TenantId, domain: &str) -> StorageResult<Tenant>;

    /// Marks a domain as central (administrative routes only).
    ///
    /// Designating an existing central domain again is a no-op.
    async fn designate_central_domain(&self, domain: &str) -> StorageResult<()>;

    /// Lists the central domains.
    async fn central_domains(&self) -> StorageResult<Vec<String>>;

    /// Returns what a domain is bound to, if anything.
    async fn find_domain(&self, domain: &str) -> StorageResult<Option<DomainBinding>>;

    /// Checks that the registry store is reachable.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
