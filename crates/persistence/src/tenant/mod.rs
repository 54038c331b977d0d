//! Tenant management for multi-tenant entity storage.
//!
//! # Core Types
//!
//! - [`TenantId`] - Stable tenant slug
//! - [`Tenant`] - A registered tenant with its domains
//! - [`CentralRegistry`] - Shared store of tenants and domain bindings
//! - [`TenantResolver`] - Maps a request host to a tenant or a central domain
//! - [`RequestMetadata`] - Request facts recorded in audit stamps
//!
//! # Resolution
//!
//! Every domain is bound either to exactly one tenant or to nothing, in which
//! case it is a central domain that only serves administrative routes:
//!
//! ```text
//! acme.example.com   -> tenant "acme"
//! crm.acme.test      -> tenant "acme"
//! admin.example.com  -> central
//! ```

mod context;
mod id;
mod record;
mod registry;
mod resolver;

pub use context::RequestMetadata;
pub use id::{MAX_TENANT_ID_LENGTH, TenantId};
pub use record::{DomainBinding, NewTenant, Tenant};
pub use registry::CentralRegistry;
pub use resolver::{HostResolution, TenantResolver, normalize_host};
