//! Atrium Persistence Layer
//!
//! This crate provides tenant-isolated storage for business entities together
//! with the lifecycle every entity shares: hide, move to trash, restore and
//! permanent deletion, each stamped with audit metadata.
//!
//! # Architecture
//!
//! - [`tenant`] - Tenant records, the central registry contract and host resolution
//! - [`strategy`] - Database-per-tenant store naming and pool bookkeeping
//! - [`lifecycle`] - Lifecycle envelope, read scopes, audit stamping and the trash manager
//! - [`entity`] - Entity definitions, catalog and stored records
//! - [`core`] - The tenant-bound entity store trait
//! - [`types`] - Pagination
//! - [`error`] - Error types for all operations
//! - [`backends`] - SQLite implementations of the registry, router and store
//!
//! # Request flow
//!
//! A request host is resolved to a [`Tenant`](tenant::Tenant) through the
//! [`TenantResolver`](tenant::TenantResolver). The tenant is bound to its own
//! store by the connection router, which returns a request-scoped context.
//! Reads go through an explicit [`EntityLifecycleScope`](lifecycle::EntityLifecycleScope)
//! and mutations go through the [`TrashLifecycleManager`](lifecycle::TrashLifecycleManager).
//!
//! ```
//! use atrium_persistence::lifecycle::{EntityLifecycleScope, LifecycleEnvelope};
//!
//! let envelope = LifecycleEnvelope::default();
//! assert!(EntityLifecycleScope::Default.matches(&envelope));
//! assert!(!EntityLifecycleScope::TrashOnly.matches(&envelope));
//! ```
//!
//! # Multitenancy
//!
//! There is no ambient "current tenant". Every store operation takes the
//! bound context explicitly, and a context can only be obtained for a tenant
//! that the central registry knows about.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod core;
pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod strategy;
pub mod tenant;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod backends;

pub use error::{StorageError, StorageResult};
