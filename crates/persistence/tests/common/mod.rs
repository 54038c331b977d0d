//! Shared setup for the persistence integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;

use atrium_persistence::backends::sqlite::{
    ScopedContext, SqliteCentralRegistry, SqliteStoreConfig, TenantConnectionRouter,
};
use atrium_persistence::core::EntityStore;
use atrium_persistence::entity::{EntityCatalog, EntityRecord};
use atrium_persistence::lifecycle::{AuditTrailRecorder, TrashLifecycleManager};
use atrium_persistence::strategy::{DatabasePerTenantConfig, DatabasePerTenantStrategy};
use atrium_persistence::tenant::{
    CentralRegistry, NewTenant, RequestMetadata, Tenant, TenantResolver,
};

/// A router, a central registry and a resolver over the same stores.
pub struct Harness {
    pub router: TenantConnectionRouter,
    pub registry: Arc<SqliteCentralRegistry>,
    pub resolver: TenantResolver,
    // Keeps the data directory alive for file-backed harnesses.
    _dir: Option<TempDir>,
}

impl Harness {
    /// Every store in private in-memory databases.
    pub fn in_memory() -> Self {
        Self::build(DatabasePerTenantConfig::in_memory(), None)
    }

    /// Every store in files under a temporary directory.
    pub fn on_disk() -> Self {
        Self::on_disk_with(DatabasePerTenantConfig::new())
    }

    /// File-backed harness with a custom tenancy configuration.
    pub fn on_disk_with(config: DatabasePerTenantConfig) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = config.with_data_dir(dir.path());
        Self::build(config, Some(dir))
    }

    fn build(config: DatabasePerTenantConfig, dir: Option<TempDir>) -> Self {
        let strategy = DatabasePerTenantStrategy::new(config).expect("Invalid tenancy config");
        let router = TenantConnectionRouter::new(
            strategy,
            SqliteStoreConfig::default(),
            Arc::new(EntityCatalog::builtin()),
        )
        .expect("Failed to create router");
        let registry = Arc::new(router.open_registry().expect("Failed to open registry"));
        let resolver = TenantResolver::new(registry.clone());

        Self {
            router,
            registry,
            resolver,
            _dir: dir,
        }
    }

    /// Registers and provisions a tenant serving `<id>.example.com`.
    pub async fn tenant(&self, id: &str) -> Tenant {
        let tenant = self
            .registry
            .create_tenant(NewTenant::new(id, id).with_domain(format!("{id}.example.com")))
            .await
            .expect("Failed to register tenant");
        self.router.provision(&tenant).expect("Failed to provision tenant");
        tenant
    }

    /// Binds a request from `ip` to the tenant's store.
    pub fn bind(&self, tenant: &Tenant, ip: &str) -> ScopedContext {
        self.router
            .bind(tenant, RequestMetadata::new().with_ip(ip))
            .expect("Failed to bind tenant store")
    }
}

/// A lifecycle manager for one of the built-in entity types.
pub fn manager(entity: &str) -> TrashLifecycleManager {
    let definition = EntityCatalog::builtin()
        .get(entity)
        .expect("Unknown entity")
        .clone();
    TrashLifecycleManager::new(definition, AuditTrailRecorder::default())
}

/// Inserts a record through the manager's entity definition.
pub async fn insert(
    store: &mut ScopedContext,
    manager: &TrashLifecycleManager,
    data: Value,
) -> EntityRecord {
    store
        .insert(manager.definition(), data)
        .await
        .expect("Failed to insert record")
}
