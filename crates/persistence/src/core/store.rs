//! The tenant-bound entity store.

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::{EntityDefinition, EntityRecord};
use crate::error::StorageResult;
use crate::lifecycle::{AuditRecord, EntityLifecycleScope};
use crate::tenant::{RequestMetadata, TenantId};
use crate::types::{Page, Pagination};

/// A single conditional change to a record's lifecycle envelope.
///
/// Each variant sets or clears one flag together with its audit, guarded by
/// the flag's current value, so a flag and its audit are never written apart.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeChange {
    /// `hidden: n -> s`, storing the audit.
    Hide(AuditRecord),
    /// `hidden: s -> n`, clearing the audit.
    Unhide,
    /// `trashed: n -> s`, storing the audit.
    Trash(AuditRecord),
    /// `trashed: s -> n`, clearing the audit, and optionally `hidden` too.
    Restore {
        /// Also clear `hidden` and its audit.
        clear_hidden: bool,
    },
}

impl EnvelopeChange {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            EnvelopeChange::Hide(_) => "hide",
            EnvelopeChange::Unhide => "unhide",
            EnvelopeChange::Trash(_) => "trash",
            EnvelopeChange::Restore { .. } => "restore",
        }
    }
}

/// Entity storage bound to exactly one tenant for one request.
///
/// Implementations are obtained from a connection router and only ever see
/// their own tenant's store. Every read takes an explicit
/// [`EntityLifecycleScope`].
///
/// Methods take `&mut self`: a bound store is used by one task at a time.
#[async_trait]
pub trait EntityStore: Send {
    /// The tenant this store is bound to.
    fn tenant_id(&self) -> &TenantId;

    /// Metadata of the request that owns this binding.
    fn request(&self) -> &RequestMetadata;

    /// Creates the entity's table if it does not exist.
    async fn ensure_entity(&mut self, definition: &EntityDefinition) -> StorageResult<()>;

    /// Inserts a new active record.
    ///
    /// `data` must be a JSON object. A string `"id"` field is used as the
    /// record id (and removed from the data); otherwise an id is generated.
    async fn insert(
        &mut self,
        definition: &EntityDefinition,
        data: Value,
    ) -> StorageResult<EntityRecord>;

    /// Fetches a record if it exists and is inside `scope`.
    async fn fetch(
        &mut self,
        definition: &EntityDefinition,
        id: &str,
        scope: EntityLifecycleScope,
    ) -> StorageResult<Option<EntityRecord>>;

    /// Lists records inside `scope`, oldest first.
    async fn list(
        &mut self,
        definition: &EntityDefinition,
        scope: EntityLifecycleScope,
        pagination: Pagination,
    ) -> StorageResult<Page<EntityRecord>>;

    /// Counts records inside `scope`.
    async fn count(
        &mut self,
        definition: &EntityDefinition,
        scope: EntityLifecycleScope,
    ) -> StorageResult<u64>;

    /// Applies a guarded envelope change. Returns `false` if no row matched
    /// the guard (missing record or flag already in the target state).
    async fn update_envelope(
        &mut self,
        definition: &EntityDefinition,
        id: &str,
        change: &EnvelopeChange,
    ) -> StorageResult<bool>;

    /// Physically deletes a record, only if it is trashed. Returns `false`
    /// if no trashed record with this id exists.
    async fn delete_trashed(
        &mut self,
        definition: &EntityDefinition,
        id: &str,
    ) -> StorageResult<bool>;
}
