//! Record lifecycle shared by every entity type.
//!
//! - [`LifecycleEnvelope`] - The `hidden` / `trashed` flags and their audits
//! - [`EntityLifecycleScope`] - Explicit read predicates over the envelope
//! - [`AuditTrailRecorder`] - Builds audit metadata for a flag change
//! - [`TrashLifecycleManager`] - hide, unhide, move to trash, restore, force delete
//!
//! The capabilities are split into small traits: [`Auditable`],
//! [`SoftDeletable`] and [`Trashable`].

mod audit;
mod envelope;
mod manager;
mod scope;

pub use audit::{
    AuditSubject, AuditTrailRecorder, Auditable, Clock, FixedClock, SystemClock, require_actor,
};
pub use envelope::{
    AuditRecord, AuditVerb, FLAG_CLEAR, FLAG_SET, LifecycleEnvelope, LifecycleState, flag_from_sql,
    flag_to_sql,
};
pub use manager::{SoftDeletable, Trashable, TrashLifecycleManager};
pub use scope::EntityLifecycleScope;
