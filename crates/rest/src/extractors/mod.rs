//! Axum extractors for the Atrium REST API.
//!
//! - [`TenantScope`]: resolves the host to a tenant and binds its store
//! - [`CentralHost`]: admits only central (administrative) hosts
//! - [`Actor`]: the acting user from `X-Actor-Id`
//! - [`PageParams`]: `offset` / `limit` query parameters

mod actor;
mod host;
mod pagination;
mod tenant;

pub use actor::{Actor, X_ACTOR_ID};
pub use host::{RequestHost, X_FORWARDED_HOST};
pub use pagination::PageParams;
pub use tenant::{CentralHost, TenantScope, X_REAL_IP, X_REQUEST_ID, request_metadata};
