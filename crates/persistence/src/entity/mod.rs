//! Entity types and stored records.
//!
//! Entity-specific business rules live outside this crate. Here an entity
//! type is only a table name, the field used to label its records in audit
//! stamps, and the lifecycle operations it supports.

mod definition;
mod record;

pub use definition::{EntityCatalog, EntityDefinition, LifecyclePolicy};
pub use record::EntityRecord;
