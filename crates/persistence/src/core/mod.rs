//! Core storage traits.
//!
//! - [`EntityStore`] - Tenant-bound record access behind an explicit scope
//! - [`EnvelopeChange`] - Guarded lifecycle mutations applied by a store
//!
//! Lifecycle rules (which transitions are legal, what gets audited) live in
//! [`lifecycle`](crate::lifecycle); a store only applies the changes it is
//! given.

mod store;

pub use store::{EntityStore, EnvelopeChange};
