//! [`EntityStore`] implementation over a bound tenant connection.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::{ErrorCode, OptionalExtension, Row, params};
use serde_json::Value;
use tracing::debug;

use crate::core::{EntityStore, EnvelopeChange};
use crate::entity::{EntityDefinition, EntityRecord};
use crate::error::{LifecycleError, StorageError, StorageResult, ValidationError};
use crate::lifecycle::{
    AuditRecord, EntityLifecycleScope, FLAG_CLEAR, FLAG_SET, LifecycleEnvelope, flag_from_sql,
};
use crate::tenant::{RequestMetadata, TenantId};
use crate::types::{Page, Pagination};

use super::registry::parse_timestamp;
use super::router::ScopedContext;
use super::schema;

const COLUMNS: &str = "id, data, hidden, trashed, hidden_audit, trashed_audit, created_at, updated_at";

/// A row as stored, before decoding.
struct RawRow {
    id: String,
    data: String,
    hidden: String,
    trashed: String,
    hidden_audit: Option<String>,
    trashed_audit: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            data: row.get(1)?,
            hidden: row.get(2)?,
            trashed: row.get(3)?,
            hidden_audit: row.get(4)?,
            trashed_audit: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_record(self, entity: &str) -> StorageResult<EntityRecord> {
        let audit = |raw: Option<String>| -> StorageResult<Option<AuditRecord>> {
            raw.map(|s| serde_json::from_str::<AuditRecord>(&s))
                .transpose()
                .map_err(Into::into)
        };

        Ok(EntityRecord {
            id: self.id,
            entity: entity.to_string(),
            data: serde_json::from_str(&self.data)?,
            envelope: LifecycleEnvelope {
                hidden: flag_from_sql(&self.hidden),
                trashed: flag_from_sql(&self.trashed),
                hidden_audit: audit(self.hidden_audit)?,
                trashed_audit: audit(self.trashed_audit)?,
            },
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Splits the record id out of the payload, generating one if absent.
fn take_id(data: Value) -> StorageResult<(String, Value)> {
    let Value::Object(mut map) = data else {
        return Err(ValidationError::InvalidRecord {
            message: "record data must be a JSON object".to_string(),
        }
        .into());
    };

    let id = match map.remove("id") {
        None | Some(Value::Null) => uuid::Uuid::new_v4().to_string(),
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(_) => {
            return Err(ValidationError::InvalidRecord {
                message: "'id' must be a non-empty string".to_string(),
            }
            .into());
        }
    };

    Ok((id, Value::Object(map)))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl ScopedContext {
    fn fetch_row(
        &self,
        definition: &EntityDefinition,
        id: &str,
        scope: EntityLifecycleScope,
    ) -> StorageResult<Option<EntityRecord>> {
        definition.validate()?;
        let sql = format!(
            "SELECT {COLUMNS} FROM \"{}\" WHERE id = ?1 AND ({})",
            definition.table(),
            scope.sql_predicate()
        );

        let raw = self
            .conn
            .query_row(&sql, [id], RawRow::from_row)
            .optional()?;
        raw.map(|r| r.into_record(&definition.name)).transpose()
    }
}

#[async_trait]
impl EntityStore for ScopedContext {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant.id
    }

    fn request(&self) -> &RequestMetadata {
        &self.request
    }

    async fn ensure_entity(&mut self, definition: &EntityDefinition) -> StorageResult<()> {
        schema::create_entity_table(&self.conn, definition)
    }

    async fn insert(
        &mut self,
        definition: &EntityDefinition,
        data: Value,
    ) -> StorageResult<EntityRecord> {
        definition.validate()?;
        let (id, data) = take_id(data)?;
        let now = now();

        let sql = format!(
            "INSERT INTO \"{}\" (id, data, hidden, trashed, created_at, updated_at)
             VALUES (?1, ?2, '{FLAG_CLEAR}', '{FLAG_CLEAR}', ?3, ?3)",
            definition.table()
        );
        match self
            .conn
            .execute(&sql, params![id, serde_json::to_string(&data)?, now])
        {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(LifecycleError::EntityAlreadyExists {
                    entity: definition.name.clone(),
                    id,
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        }

        debug!(
            tenant_id = %self.tenant.id,
            entity = %definition.name,
            id = %id,
            "Inserted record"
        );

        self.fetch_row(definition, &id, EntityLifecycleScope::Unscoped)?
            .ok_or_else(|| StorageError::not_found(&definition.name, &id))
    }

    async fn fetch(
        &mut self,
        definition: &EntityDefinition,
        id: &str,
        scope: EntityLifecycleScope,
    ) -> StorageResult<Option<EntityRecord>> {
        self.fetch_row(definition, id, scope)
    }

    async fn list(
        &mut self,
        definition: &EntityDefinition,
        scope: EntityLifecycleScope,
        pagination: Pagination,
    ) -> StorageResult<Page<EntityRecord>> {
        let total = self.count(definition, scope).await?;

        let sql = format!(
            "SELECT {COLUMNS} FROM \"{}\" WHERE {} ORDER BY created_at, rowid LIMIT ?1 OFFSET ?2",
            definition.table(),
            scope.sql_predicate()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![pagination.limit, pagination.offset], RawRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let items = rows
            .into_iter()
            .map(|r| r.into_record(&definition.name))
            .collect::<StorageResult<Vec<_>>>()?;

        debug!(
            tenant_id = %self.tenant().id,
            entity = %definition.name,
            scope = %scope,
            total,
            "Listed records"
        );
        Ok(Page::new(items, total, pagination))
    }

    async fn count(
        &mut self,
        definition: &EntityDefinition,
        scope: EntityLifecycleScope,
    ) -> StorageResult<u64> {
        definition.validate()?;
        let sql = format!(
            "SELECT COUNT(*) FROM \"{}\" WHERE {}",
            definition.table(),
            scope.sql_predicate()
        );
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn update_envelope(
        &mut self,
        definition: &EntityDefinition,
        id: &str,
        change: &EnvelopeChange,
    ) -> StorageResult<bool> {
        definition.validate()?;
        let table = definition.table();
        let now = now();

        // Each statement writes a flag together with its audit and is guarded
        // by the flag's current value.
        let updated = match change {
            EnvelopeChange::Hide(audit) => self.conn.execute(
                &format!(
                    "UPDATE \"{table}\" SET hidden = '{FLAG_SET}', hidden_audit = ?2, updated_at = ?3
                     WHERE id = ?1 AND hidden = '{FLAG_CLEAR}'"
                ),
                params![id, audit.to_json().to_string(), now],
            )?,
            EnvelopeChange::Unhide => self.conn.execute(
                &format!(
                    "UPDATE \"{table}\" SET hidden = '{FLAG_CLEAR}', hidden_audit = NULL, updated_at = ?2
                     WHERE id = ?1 AND hidden = '{FLAG_SET}'"
                ),
                params![id, now],
            )?,
            EnvelopeChange::Trash(audit) => self.conn.execute(
                &format!(
                    "UPDATE \"{table}\" SET trashed = '{FLAG_SET}', trashed_audit = ?2, updated_at = ?3
                     WHERE id = ?1 AND trashed = '{FLAG_CLEAR}'"
                ),
                params![id, audit.to_json().to_string(), now],
            )?,
            EnvelopeChange::Restore { clear_hidden } => {
                let hidden = if *clear_hidden {
                    format!(", hidden = '{FLAG_CLEAR}', hidden_audit = NULL")
                } else {
                    String::new()
                };
                self.conn.execute(
                    &format!(
                        "UPDATE \"{table}\" SET trashed = '{FLAG_CLEAR}', trashed_audit = NULL{hidden}, updated_at = ?2
                         WHERE id = ?1 AND trashed = '{FLAG_SET}'"
                    ),
                    params![id, now],
                )?
            }
        };

        Ok(updated > 0)
    }

    async fn delete_trashed(
        &mut self,
        definition: &EntityDefinition,
        id: &str,
    ) -> StorageResult<bool> {
        definition.validate()?;
        let deleted = self.conn.execute(
            &format!(
                "DELETE FROM \"{}\" WHERE id = ?1 AND trashed = '{FLAG_SET}'",
                definition.table()
            ),
            [id],
        )?;
        Ok(deleted > 0)
    }
}
