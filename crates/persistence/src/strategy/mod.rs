//! Tenant store isolation strategy.
//!
//! Every tenant owns a physically separate database. The strategy decides
//! where that database lives and what it is called, derived only from the
//! tenant id so that the mapping survives restarts.
//!
//! # Example
//!
//! ```
//! use atrium_persistence::strategy::{DatabasePerTenantConfig, DatabasePerTenantStrategy};
//! use atrium_persistence::tenant::TenantId;
//!
//! let strategy = DatabasePerTenantStrategy::new(DatabasePerTenantConfig::default()).unwrap();
//! assert_eq!(strategy.database_name(&TenantId::new("acme")), "tenant_acme");
//! ```

mod database_per_tenant;

pub use database_per_tenant::{DatabasePerTenantConfig, DatabasePerTenantStrategy, StorageMode};

use std::fmt;
use std::path::PathBuf;

use crate::error::ValidationError;
use crate::tenant::TenantId;

/// Where a store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A database file on disk.
    File(PathBuf),
    /// A named shared-cache in-memory database, identified by its URI.
    Memory(String),
}

impl StoreLocation {
    /// Returns `true` for in-memory stores.
    pub fn is_memory(&self) -> bool {
        matches!(self, StoreLocation::Memory(_))
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}", path.display()),
            StoreLocation::Memory(uri) => write!(f, "{}", uri),
        }
    }
}

/// Maps tenants to their stores.
pub trait StoreLocator: Send + Sync {
    /// Returns the location of the tenant's store.
    fn locate(&self, tenant_id: &TenantId) -> StoreLocation;

    /// Validates that a tenant id can be mapped to a store.
    fn validate(&self, tenant_id: &TenantId) -> Result<(), TenantValidationError>;

    /// Returns the location of the central registry store.
    fn central_store(&self) -> StoreLocation;
}

/// A tenant id that cannot be mapped to a store.
#[derive(Debug, Clone)]
pub struct TenantValidationError {
    /// The rejected tenant id.
    pub tenant_id: String,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for TenantValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid tenant '{}': {}", self.tenant_id, self.reason)
    }
}

impl std::error::Error for TenantValidationError {}

impl From<TenantValidationError> for ValidationError {
    fn from(err: TenantValidationError) -> Self {
        ValidationError::InvalidIdentifier {
            kind: "tenant id",
            value: err.tenant_id,
            reason: err.reason,
        }
    }
}
