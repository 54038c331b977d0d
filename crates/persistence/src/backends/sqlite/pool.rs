//! Connection pool construction shared by the registry and tenant stores.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, StorageError, StorageResult};
use crate::strategy::StoreLocation;

/// Connection settings applied to every SQLite connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key constraints.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqliteStoreConfig {
    /// Sets the connection timeout.
    pub fn with_connection_timeout_ms(mut self, ms: u64) -> Self {
        self.connection_timeout_ms = ms;
        self
    }
}

/// Pool sizing for one store.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PoolSize {
    pub min_idle: u32,
    pub max_size: u32,
}

/// Builds a pool for `location`.
///
/// In-memory stores get exactly one connection that never expires: a
/// shared-cache database disappears when its last connection closes, and
/// shared-cache locking is per table.
pub(crate) fn build_pool(
    location: &StoreLocation,
    config: &SqliteStoreConfig,
    size: PoolSize,
) -> StorageResult<Pool<SqliteConnectionManager>> {
    let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
    let foreign_keys = config.enable_foreign_keys;
    let wal = config.enable_wal && !location.is_memory();

    let manager = match location {
        StoreLocation::File(path) => SqliteConnectionManager::file(path),
        StoreLocation::Memory(uri) => SqliteConnectionManager::file(uri).with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
    }
    .with_init(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        if foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        if wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        Ok(())
    });

    let builder = Pool::builder().connection_timeout(Duration::from_millis(
        config.connection_timeout_ms,
    ));
    let builder = if location.is_memory() {
        builder
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        builder
            .max_size(size.max_size.max(1))
            .min_idle(Some(size.min_idle.min(size.max_size)))
    };

    builder.build(manager).map_err(|e| {
        StorageError::Backend(BackendError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: format!("{}: {}", location, e),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_defaults() {
        let config: SqliteStoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.enable_wal);
        assert!(config.enable_foreign_keys);
    }

    #[test]
    fn test_memory_pool_shares_one_database() {
        let location = StoreLocation::Memory(format!(
            "file:pool_test_{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4().simple()
        ));
        let pool = build_pool(
            &location,
            &SqliteStoreConfig::default(),
            PoolSize {
                min_idle: 1,
                max_size: 4,
            },
        )
        .unwrap();

        {
            let conn = pool.get().unwrap();
            conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
                .unwrap();
        }

        let conn = pool.get().unwrap();
        let x: i64 = conn.query_row("SELECT x FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(x, 1);
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn test_file_pool_enables_wal() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::File(dir.path().join("wal.db"));
        let pool = build_pool(
            &location,
            &SqliteStoreConfig::default(),
            PoolSize {
                min_idle: 1,
                max_size: 2,
            },
        )
        .unwrap();

        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
