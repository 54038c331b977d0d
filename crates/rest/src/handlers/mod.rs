//! HTTP request handlers.
//!
//! - [`entities`] - List, create and read visible records
//! - [`trash`] - Trash listing, move to trash, restore, force delete
//! - [`visibility`] - Hide and unhide
//! - [`tenants`] - Central registry administration
//! - [`health`] - Health check endpoint

pub mod entities;
pub mod health;
pub mod tenants;
pub mod trash;
pub mod visibility;

pub use entities::{create_handler, list_handler, read_handler};
pub use health::health_handler;
pub use tenants::{
    attach_domain_handler, create_tenant_handler, detach_domain_handler, get_tenant_handler,
    list_tenants_handler, set_active_handler,
};
pub use trash::{force_delete_handler, move_to_trash_handler, restore_handler, trash_list_handler};
pub use visibility::{hide_handler, unhide_handler};
