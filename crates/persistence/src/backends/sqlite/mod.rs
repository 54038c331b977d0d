//! SQLite backend.
//!
//! Provides the central registry, the per-tenant connection router and the
//! entity store behind a bound [`ScopedContext`]. Stores live in database
//! files under a data directory, or in shared-cache in-memory databases for
//! tests and ephemeral deployments.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use atrium_persistence::backends::sqlite::{SqliteStoreConfig, TenantConnectionRouter};
//! use atrium_persistence::entity::EntityCatalog;
//! use atrium_persistence::strategy::{DatabasePerTenantConfig, DatabasePerTenantStrategy};
//! use atrium_persistence::tenant::{CentralRegistry, NewTenant, RequestMetadata};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let strategy = DatabasePerTenantStrategy::new(
//!     DatabasePerTenantConfig::new().with_data_dir("./data"),
//! )?;
//! let router = TenantConnectionRouter::new(
//!     strategy,
//!     SqliteStoreConfig::default(),
//!     Arc::new(EntityCatalog::builtin()),
//! )?;
//! let registry = router.open_registry()?;
//!
//! let tenant = registry
//!     .create_tenant(NewTenant::new("acme", "Acme").with_domain("acme.example.com"))
//!     .await?;
//! router.provision(&tenant)?;
//!
//! let ctx = router.bind(&tenant, RequestMetadata::new())?;
//! # drop(ctx);
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! Each tenant database holds one table per entity type:
//!
//! ```sql
//! CREATE TABLE clients (
//!     id TEXT PRIMARY KEY,
//!     data TEXT NOT NULL,                 -- JSON object
//!     hidden TEXT NOT NULL DEFAULT 'n',   -- 's' / 'n'
//!     trashed TEXT NOT NULL DEFAULT 'n',  -- 's' / 'n'
//!     hidden_audit TEXT,                  -- JSON, present iff hidden = 's'
//!     trashed_audit TEXT,                 -- JSON, present iff trashed = 's'
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! ```

mod pool;
mod registry;
mod router;
mod schema;
mod store;

pub use pool::SqliteStoreConfig;
pub use registry::SqliteCentralRegistry;
pub use router::{RouterHealth, ScopedContext, TenantConnectionRouter};
pub use schema::{CENTRAL_SCHEMA_VERSION, TENANT_SCHEMA_VERSION};
