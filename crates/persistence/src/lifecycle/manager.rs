//! The trash lifecycle state machine.
//!
//! ```text
//!            hide                  move_to_trash
//!   Active --------> Hidden   Active|Hidden ------> Trashed
//!          <--------                         <------
//!            unhide                  restore
//!
//!   Trashed --force_delete--> (removed)
//! ```
//!
//! `hide`, `unhide` and `move_to_trash` are idempotent. `restore` and
//! `force_delete` require a trashed record. Every operation requires an
//! acting user and looks the record up without any lifecycle filter.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::{EntityStore, EnvelopeChange};
use crate::entity::{EntityDefinition, EntityRecord};
use crate::error::{LifecycleError, StorageError, StorageResult};

use super::audit::{AuditSubject, AuditTrailRecorder, Auditable, require_actor};
use super::envelope::{AuditRecord, AuditVerb, LifecycleState};
use super::scope::EntityLifecycleScope;

/// Capability: toggle a record's visibility.
#[async_trait]
pub trait SoftDeletable {
    /// Sets `hidden` and stamps its audit. No-op on a hidden record.
    async fn hide(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
    ) -> StorageResult<EntityRecord>;

    /// Clears `hidden` and its audit. No-op on a visible record.
    async fn unhide(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
    ) -> StorageResult<EntityRecord>;
}

/// Capability: move records through the trash bin.
#[async_trait]
pub trait Trashable {
    /// Sets `trashed` and stamps its audit. No-op on a trashed record.
    async fn move_to_trash(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> StorageResult<EntityRecord>;

    /// Clears `trashed` and its audit. Fails unless the record is trashed.
    async fn restore(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
    ) -> StorageResult<EntityRecord>;

    /// Permanently removes a trashed record. Fails unless the record is trashed.
    async fn force_delete(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
    ) -> StorageResult<()>;
}

/// Applies lifecycle transitions to records of one entity type.
#[derive(Debug, Clone)]
pub struct TrashLifecycleManager {
    definition: EntityDefinition,
    recorder: AuditTrailRecorder,
}

impl TrashLifecycleManager {
    /// Creates a manager for `definition`.
    pub fn new(definition: EntityDefinition, recorder: AuditTrailRecorder) -> Self {
        Self {
            definition,
            recorder,
        }
    }

    /// The entity type this manager handles.
    pub fn definition(&self) -> &EntityDefinition {
        &self.definition
    }

    async fn load(&self, store: &mut dyn EntityStore, id: &str) -> StorageResult<EntityRecord> {
        store
            .fetch(&self.definition, id, EntityLifecycleScope::Unscoped)
            .await?
            .ok_or_else(|| StorageError::not_found(&self.definition.name, id))
    }

    fn require_trash(&self) -> StorageResult<()> {
        if self.definition.supports_trash() {
            Ok(())
        } else {
            Err(LifecycleError::TrashNotSupported {
                entity: self.definition.name.clone(),
            }
            .into())
        }
    }

    fn invalid(&self, id: &str, operation: &'static str, state: LifecycleState) -> StorageError {
        LifecycleError::InvalidTransition {
            entity: self.definition.name.clone(),
            id: id.to_string(),
            operation,
            state,
        }
        .into()
    }

    fn stamp(
        &self,
        store: &dyn EntityStore,
        verb: AuditVerb,
        record: &EntityRecord,
        actor: &str,
        reason: Option<&str>,
    ) -> StorageResult<AuditRecord> {
        let label = record.label(&self.definition.label_field);
        self.recorder.stamp(
            verb,
            Some(actor),
            reason,
            AuditSubject {
                table: self.definition.table(),
                label: &label,
            },
            store.request(),
        )
    }

    /// Applies `change`, then re-reads the record.
    async fn apply(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        change: EnvelopeChange,
    ) -> StorageResult<(bool, EntityRecord)> {
        let changed = store.update_envelope(&self.definition, id, &change).await?;
        let record = self.load(store, id).await?;
        debug!(
            tenant_id = %store.tenant_id(),
            entity = %self.definition.name,
            id = %id,
            change = change.name(),
            changed,
            "Applied lifecycle change"
        );
        Ok((changed, record))
    }
}

#[async_trait]
impl SoftDeletable for TrashLifecycleManager {
    async fn hide(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
    ) -> StorageResult<EntityRecord> {
        let actor = require_actor(actor, "hide")?;
        let record = self.load(store, id).await?;
        if record.envelope.hidden {
            return Ok(record);
        }

        let audit = self.stamp(&*store, AuditVerb::Hidden, &record, actor, None)?;
        let (_, record) = self.apply(store, id, EnvelopeChange::Hide(audit)).await?;
        Ok(record)
    }

    async fn unhide(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
    ) -> StorageResult<EntityRecord> {
        require_actor(actor, "unhide")?;
        let record = self.load(store, id).await?;
        if !record.envelope.hidden {
            return Ok(record);
        }

        let (_, record) = self.apply(store, id, EnvelopeChange::Unhide).await?;
        Ok(record)
    }
}

#[async_trait]
impl Trashable for TrashLifecycleManager {
    async fn move_to_trash(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> StorageResult<EntityRecord> {
        self.require_trash()?;
        let actor = require_actor(actor, "move to trash")?;
        let record = self.load(store, id).await?;
        if record.envelope.trashed {
            return Ok(record);
        }

        let audit = self.stamp(&*store, AuditVerb::Trashed, &record, actor, reason)?;
        let (_, record) = self.apply(store, id, EnvelopeChange::Trash(audit)).await?;
        Ok(record)
    }

    async fn restore(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
    ) -> StorageResult<EntityRecord> {
        self.require_trash()?;
        require_actor(actor, "restore")?;
        let record = self.load(store, id).await?;
        if !record.envelope.trashed {
            return Err(self.invalid(id, "restore", record.state()));
        }

        let change = EnvelopeChange::Restore {
            clear_hidden: self.definition.restore_clears_hidden(),
        };
        let (changed, record) = self.apply(store, id, change).await?;
        if !changed {
            // Restored by a concurrent request between our read and write.
            return Err(self.invalid(id, "restore", record.state()));
        }
        Ok(record)
    }

    async fn force_delete(
        &self,
        store: &mut dyn EntityStore,
        id: &str,
        actor: Option<&str>,
    ) -> StorageResult<()> {
        self.require_trash()?;
        let actor = require_actor(actor, "permanently delete")?;
        let record = self.load(store, id).await?;
        if !record.envelope.trashed {
            return Err(self.invalid(id, "permanently delete", record.state()));
        }

        if !store.delete_trashed(&self.definition, id).await? {
            let current = self.load(store, id).await?;
            return Err(self.invalid(id, "permanently delete", current.state()));
        }

        info!(
            tenant_id = %store.tenant_id(),
            entity = %self.definition.name,
            id = %id,
            actor = %actor,
            label = %record.label(&self.definition.label_field),
            "Permanently deleted record"
        );
        Ok(())
    }
}
