//! Error types for the persistence layer.
//!
//! Errors are grouped by concern: tenant resolution and routing, record
//! lifecycle transitions, input validation, and backend failures. Every
//! variant is scoped to a single request; none of them is fatal to the
//! process.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::lifecycle::LifecycleState;
use crate::tenant::TenantId;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Tenant resolution and connection routing errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Record lifecycle errors
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised while resolving a request to a tenant or binding its store.
#[derive(Error, Debug)]
pub enum TenantError {
    /// The request host matches no registered domain.
    #[error("no tenant is registered for host '{host}'")]
    NotResolved { host: String },

    /// A tenant-only route was reached through a central domain.
    #[error("host '{host}' is a central domain and cannot serve tenant routes")]
    CentralDomainAccessDenied { host: String },

    /// A central-only route was reached through a tenant domain.
    #[error("host '{host}' is not a central domain")]
    CentralRouteDenied { host: String },

    /// The tenant exists but is deactivated.
    #[error("tenant suspended: {tenant_id}")]
    TenantSuspended { tenant_id: TenantId },

    /// The tenant's store could not be bound.
    #[error("store for tenant {tenant_id} is unavailable: {message}")]
    ConnectionUnavailable {
        tenant_id: TenantId,
        message: String,
    },

    /// The specified tenant does not exist in the central registry.
    #[error("unknown tenant: {tenant_id}")]
    UnknownTenant { tenant_id: TenantId },

    /// A tenant with this id is already registered.
    #[error("tenant already exists: {tenant_id}")]
    AlreadyExists { tenant_id: TenantId },

    /// The domain is already bound to a tenant or designated central.
    #[error("domain '{domain}' is already assigned")]
    DomainAlreadyAssigned { domain: String },

    /// The domain is not attached to the tenant it was detached from.
    #[error("domain '{domain}' is not attached to tenant {tenant_id}")]
    DomainNotAttached { tenant_id: TenantId, domain: String },

    /// Detaching the domain would leave the tenant unreachable.
    #[error("domain '{domain}' is the last domain of tenant {tenant_id}")]
    LastDomain { tenant_id: TenantId, domain: String },
}

/// Errors raised by entity lookups and lifecycle transitions.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The record does not exist in the bound tenant's store.
    #[error("{entity} not found: {id}")]
    EntityNotFound { entity: String, id: String },

    /// A record with this id already exists in the bound tenant's store.
    #[error("{entity} already exists: {id}")]
    EntityAlreadyExists { entity: String, id: String },

    /// The requested transition is not allowed from the record's state.
    #[error("cannot {operation} {entity}/{id} while it is {state}")]
    InvalidTransition {
        entity: String,
        id: String,
        operation: &'static str,
        state: LifecycleState,
    },

    /// The operation needs an acting user and none was supplied.
    #[error("an acting user is required to {operation}")]
    ActorRequired { operation: &'static str },

    /// The entity type only supports the visibility toggle.
    #[error("{entity} records cannot be moved to the trash")]
    TrashNotSupported { entity: String },
}

/// Errors related to caller input.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The entity type is not part of the catalog.
    #[error("unknown entity type: {entity}")]
    UnknownEntity { entity: String },

    /// An identifier failed its format check.
    #[error("invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: String,
    },

    /// The record payload was rejected.
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Shorthand for a not-found lifecycle error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StorageError::Lifecycle(LifecycleError::EntityNotFound {
            entity: entity.into(),
            id: id.into(),
        })
    }

    /// Returns `true` if this error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::Lifecycle(LifecycleError::EntityNotFound { .. })
        )
    }
}

// Implement conversions from common error types

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Internal {
            backend_name: "filesystem".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
