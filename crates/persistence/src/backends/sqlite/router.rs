//! Request-scoped binding of tenants to their own SQLite stores.
//!
//! The router keeps one connection pool per tenant, opened lazily and keyed
//! by tenant id. [`TenantConnectionRouter::bind`] checks out a connection from
//! the tenant's pool and wraps it in a [`ScopedContext`]; the connection goes
//! back to the pool when the context is dropped.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::entity::EntityCatalog;
use crate::error::{BackendError, StorageError, StorageResult, TenantError};
use crate::strategy::{DatabasePerTenantStrategy, StorageMode, StoreLocation, StoreLocator};
use crate::tenant::{RequestMetadata, Tenant, TenantId};

use super::pool::{PoolSize, SqliteStoreConfig, build_pool};
use super::registry::SqliteCentralRegistry;
use super::schema;

type TenantPool = Pool<SqliteConnectionManager>;

/// Routes each tenant to its own isolated store.
pub struct TenantConnectionRouter {
    strategy: DatabasePerTenantStrategy,
    store_config: SqliteStoreConfig,
    catalog: Arc<EntityCatalog>,
    pools: RwLock<HashMap<TenantId, TenantPool>>,
}

impl Debug for TenantConnectionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConnectionRouter")
            .field("storage", &self.strategy.config().storage)
            .field("open_pools", &self.open_pools())
            .finish_non_exhaustive()
    }
}

/// Snapshot reported by [`TenantConnectionRouter::health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterHealth {
    /// `"file"` or `"memory"`.
    pub storage: &'static str,
    /// Number of tenant pools currently open.
    pub open_pools: usize,
}

impl TenantConnectionRouter {
    /// Creates a router. In file mode the data directory is created if needed.
    pub fn new(
        strategy: DatabasePerTenantStrategy,
        store_config: SqliteStoreConfig,
        catalog: Arc<EntityCatalog>,
    ) -> StorageResult<Self> {
        if let StorageMode::File { data_dir } = &strategy.config().storage {
            std::fs::create_dir_all(data_dir).map_err(BackendError::from)?;
        }

        Ok(Self {
            strategy,
            store_config,
            catalog,
            pools: RwLock::new(HashMap::new()),
        })
    }

    /// The naming and pool bookkeeping strategy.
    pub fn strategy(&self) -> &DatabasePerTenantStrategy {
        &self.strategy
    }

    /// The entity types created in every tenant store.
    pub fn catalog(&self) -> &Arc<EntityCatalog> {
        &self.catalog
    }

    /// Opens the central registry next to the tenant stores.
    pub fn open_registry(&self) -> StorageResult<SqliteCentralRegistry> {
        SqliteCentralRegistry::open(self.strategy.central_store(), &self.store_config)
    }

    /// Creates the tenant's store, its schema and every catalog table.
    ///
    /// Provisioning an existing store is a no-op apart from creating tables
    /// for entity types added to the catalog since.
    pub fn provision(&self, tenant: &Tenant) -> StorageResult<()> {
        self.validate(&tenant.id)?;
        let pool = self.pool_for(&tenant.id, true)?;
        self.provision_entities(&tenant.id, &pool)?;

        info!(
            tenant_id = %tenant.id,
            location = %self.strategy.locate(&tenant.id),
            "Provisioned tenant store"
        );
        Ok(())
    }

    /// Returns `true` if the tenant's store exists.
    pub fn is_provisioned(&self, tenant_id: &TenantId) -> bool {
        if self.pools.read().contains_key(tenant_id) {
            return true;
        }
        match self.strategy.locate(tenant_id) {
            StoreLocation::File(path) => path.is_file(),
            StoreLocation::Memory(_) => false,
        }
    }

    /// Binds a request to the tenant's store.
    ///
    /// Fails with `ConnectionUnavailable` if the tenant is inactive, its store
    /// has not been provisioned (and auto-creation is off), or the pool cannot
    /// hand out a connection.
    pub fn bind(&self, tenant: &Tenant, request: RequestMetadata) -> StorageResult<ScopedContext> {
        if !tenant.active {
            return Err(unavailable(&tenant.id, "tenant is suspended"));
        }
        self.strategy
            .validate(&tenant.id)
            .map_err(|e| unavailable(&tenant.id, e.reason))?;

        let pool = self.pool_for(&tenant.id, self.strategy.config().auto_create_database)?;
        let conn = pool.get().map_err(|e| {
            warn!(tenant_id = %tenant.id, error = %e, "Tenant pool could not hand out a connection");
            unavailable(&tenant.id, e.to_string())
        })?;

        self.strategy.record_pool_access(&tenant.id);
        self.evict_least_recent(&tenant.id);

        debug!(
            tenant_id = %tenant.id,
            correlation_id = ?request.correlation_id,
            "Bound request to tenant store"
        );

        Ok(ScopedContext {
            tenant: tenant.clone(),
            request,
            conn,
        })
    }

    /// Closes a tenant's pool. Returns `false` if none was open.
    ///
    /// In memory mode this discards the tenant's data.
    pub fn evict(&self, tenant_id: &TenantId) -> bool {
        let removed = self.pools.write().remove(tenant_id).is_some();
        self.strategy.remove_pool_tracking(tenant_id.as_str());
        if removed {
            info!(tenant_id = %tenant_id, "Closed tenant pool");
        }
        removed
    }

    /// Number of tenant pools currently open.
    pub fn open_pools(&self) -> usize {
        self.pools.read().len()
    }

    /// Checks that tenant stores can be reached.
    pub fn health_check(&self) -> StorageResult<RouterHealth> {
        let storage = match &self.strategy.config().storage {
            StorageMode::File { data_dir } => {
                if !data_dir.is_dir() {
                    return Err(StorageError::Backend(BackendError::ConnectionFailed {
                        backend_name: "sqlite".to_string(),
                        message: format!("data directory {} is missing", data_dir.display()),
                    }));
                }
                "file"
            }
            StorageMode::Memory => "memory",
        };

        Ok(RouterHealth {
            storage,
            open_pools: self.open_pools(),
        })
    }

    fn validate(&self, tenant_id: &TenantId) -> StorageResult<()> {
        self.strategy
            .validate(tenant_id)
            .map_err(|e| StorageError::Validation(e.into()))
    }

    /// Returns the tenant's pool, opening it if needed.
    ///
    /// Pool creation is serialized under the write lock so that a store's
    /// schema is initialized once.
    fn pool_for(&self, tenant_id: &TenantId, create: bool) -> StorageResult<TenantPool> {
        if let Some(pool) = self.pools.read().get(tenant_id) {
            return Ok(pool.clone());
        }

        let mut pools = self.pools.write();
        if let Some(pool) = pools.get(tenant_id) {
            return Ok(pool.clone());
        }

        let location = self.strategy.locate(tenant_id);
        if !create {
            let exists = match &location {
                StoreLocation::File(path) => path.is_file(),
                StoreLocation::Memory(_) => false,
            };
            if !exists {
                return Err(unavailable(tenant_id, "store is not provisioned"));
            }
        }

        let config = self.strategy.config();
        let pool = build_pool(
            &location,
            &self.store_config,
            PoolSize {
                min_idle: config.min_connections_per_pool,
                max_size: config.max_connections_per_pool,
            },
        )
        .map_err(|e| unavailable(tenant_id, e.to_string()))?;

        {
            let conn = pool.get()?;
            schema::initialize_tenant_schema(&conn)?;
            for definition in self.catalog.iter() {
                schema::create_entity_table(&conn, definition)?;
            }
        }

        debug!(tenant_id = %tenant_id, location = %location, "Opened tenant pool");
        pools.insert(tenant_id.clone(), pool.clone());
        self.strategy.record_pool_access(tenant_id);
        Ok(pool)
    }

    fn provision_entities(&self, tenant_id: &TenantId, pool: &TenantPool) -> StorageResult<()> {
        let conn = pool
            .get()
            .map_err(|e| unavailable(tenant_id, e.to_string()))?;
        for definition in self.catalog.iter() {
            schema::create_entity_table(&conn, definition)?;
        }
        Ok(())
    }

    /// Closes least recently used file pools above `max_pools`, never the
    /// pool of `current`. In-memory pools hold their database and are kept.
    fn evict_least_recent(&self, current: &TenantId) {
        if self.strategy.is_memory() {
            return;
        }

        for id in self.strategy.tenants_to_evict() {
            if id == current.as_str() {
                continue;
            }
            let tenant_id = TenantId::new(id);
            if self.pools.write().remove(&tenant_id).is_some() {
                debug!(tenant_id = %tenant_id, "Evicted least recently used tenant pool");
            }
            self.strategy.remove_pool_tracking(tenant_id.as_str());
        }
    }
}

fn unavailable(tenant_id: &TenantId, message: impl Into<String>) -> StorageError {
    StorageError::Tenant(TenantError::ConnectionUnavailable {
        tenant_id: tenant_id.clone(),
        message: message.into(),
    })
}

/// A request bound to one tenant's store.
///
/// Owns a pooled connection to that store and nothing else; the connection
/// returns to the pool when the context is dropped.
pub struct ScopedContext {
    pub(super) tenant: Tenant,
    pub(super) request: RequestMetadata,
    pub(super) conn: PooledConnection<SqliteConnectionManager>,
}

impl ScopedContext {
    /// The tenant snapshot this context was bound with.
    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    /// Entity tables present in the bound store.
    pub fn entity_tables(&self) -> StorageResult<Vec<String>> {
        schema::entity_tables(&self.conn)
    }
}

impl Debug for ScopedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedContext")
            .field("tenant", &self.tenant.id)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl Drop for ScopedContext {
    fn drop(&mut self) {
        trace!(tenant_id = %self.tenant.id, "Released tenant store binding");
    }
}
