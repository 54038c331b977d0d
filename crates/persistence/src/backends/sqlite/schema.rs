//! SQLite schema definitions and migrations.
//!
//! Two kinds of databases exist: the central registry database and one
//! database per tenant. Both carry a `schema_version` table; entity tables
//! are created on demand in tenant databases.

use rusqlite::Connection;

use crate::entity::EntityDefinition;
use crate::error::{BackendError, StorageError, StorageResult};

/// Current central registry schema version.
pub const CENTRAL_SCHEMA_VERSION: i32 = 1;

/// Current tenant store schema version.
pub const TENANT_SCHEMA_VERSION: i32 = 1;

fn migration_error(what: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::MigrationError {
        message: format!("{}: {}", what, e),
    })
}

/// Initialize the central registry schema.
pub fn initialize_central_schema(conn: &Connection) -> StorageResult<()> {
    let current = get_schema_version(conn)?;
    if current < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tenants (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                config TEXT NOT NULL DEFAULT '{}',
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- A NULL tenant_id marks a central domain.
            CREATE TABLE IF NOT EXISTS domains (
                domain TEXT PRIMARY KEY,
                tenant_id TEXT REFERENCES tenants(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_domains_tenant ON domains(tenant_id);",
        )
        .map_err(|e| migration_error("Failed to create central registry tables", e))?;
        set_schema_version(conn, 1)?;
    }
    Ok(())
}

/// Initialize a tenant store schema.
pub fn initialize_tenant_schema(conn: &Connection) -> StorageResult<()> {
    let current = get_schema_version(conn)?;
    if current < 1 {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS entity_tables (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| migration_error("Failed to create entity_tables table", e))?;
        set_schema_version(conn, 1)?;
    }
    Ok(())
}

/// Create the table for an entity type if it does not exist.
///
/// The CHECK constraints tie each flag to the presence of its audit column.
pub fn create_entity_table(conn: &Connection, definition: &EntityDefinition) -> StorageResult<()> {
    definition.validate()?;
    let table = definition.table();

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            hidden TEXT NOT NULL DEFAULT 'n' CHECK (hidden IN ('s', 'n')),
            trashed TEXT NOT NULL DEFAULT 'n' CHECK (trashed IN ('s', 'n')),
            hidden_audit TEXT,
            trashed_audit TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((hidden = 's') = (hidden_audit IS NOT NULL)),
            CHECK ((trashed = 's') = (trashed_audit IS NOT NULL))
        );

        CREATE INDEX IF NOT EXISTS \"idx_{table}_lifecycle\" ON \"{table}\" (trashed, hidden);"
    ))
    .map_err(|e| migration_error(&format!("Failed to create table {table}"), e))?;

    conn.execute(
        "INSERT OR IGNORE INTO entity_tables (name, created_at) VALUES (?1, ?2)",
        rusqlite::params![table, chrono::Utc::now().to_rfc3339()],
    )
    .map_err(|e| migration_error("Failed to record entity table", e))?;

    Ok(())
}

/// Lists entity tables created in a tenant store.
pub fn entity_tables(conn: &Connection) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM entity_tables ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("Failed to create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error("Failed to clear schema_version", e))?;

    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error("Failed to set schema_version", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::LifecyclePolicy;

    fn clients() -> EntityDefinition {
        EntityDefinition::new("clients", "nome", LifecyclePolicy::trash()).unwrap()
    }

    #[test]
    fn test_central_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_central_schema(&conn).unwrap();
        initialize_central_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CENTRAL_SCHEMA_VERSION);
    }

    #[test]
    fn test_entity_table_creation() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_tenant_schema(&conn).unwrap();
        create_entity_table(&conn, &clients()).unwrap();
        create_entity_table(&conn, &clients()).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), TENANT_SCHEMA_VERSION);
        assert_eq!(entity_tables(&conn).unwrap(), vec!["clients".to_string()]);
    }

    #[test]
    fn test_check_constraints_tie_flags_to_audits() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_tenant_schema(&conn).unwrap();
        create_entity_table(&conn, &clients()).unwrap();

        let now = "2024-01-01T00:00:00Z";
        conn.execute(
            "INSERT INTO clients (id, data, created_at, updated_at) VALUES ('1', '{}', ?1, ?1)",
            [now],
        )
        .unwrap();

        // Flag without audit
        assert!(conn
            .execute("UPDATE clients SET trashed = 's' WHERE id = '1'", [])
            .is_err());
        // Audit without flag
        assert!(conn
            .execute("UPDATE clients SET hidden_audit = '{}' WHERE id = '1'", [])
            .is_err());
        // Unknown flag value
        assert!(conn
            .execute(
                "UPDATE clients SET hidden = 'y', hidden_audit = '{}' WHERE id = '1'",
                []
            )
            .is_err());
        // Both together
        assert!(conn
            .execute(
                "UPDATE clients SET trashed = 's', trashed_audit = '{}' WHERE id = '1'",
                []
            )
            .is_ok());
    }
}
