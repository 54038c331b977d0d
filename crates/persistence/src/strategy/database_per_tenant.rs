//! Database-per-tenant tenancy strategy.
//!
//! Each tenant has a completely separate SQLite database. Names are derived
//! from the tenant id, so the same tenant always lands in the same store and
//! two tenants never share one.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::tenant::TenantId;

use super::{StoreLocation, StoreLocator, TenantValidationError};

/// Where tenant databases are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageMode {
    /// One database file per tenant under `data_dir`.
    File {
        /// Directory holding the tenant and central databases.
        data_dir: PathBuf,
    },
    /// Shared-cache in-memory databases, private to this process.
    Memory,
}

/// Configuration for database-per-tenant strategy.
///
/// # Example
///
/// ```
/// use atrium_persistence::strategy::{DatabasePerTenantConfig, StorageMode};
///
/// let config = DatabasePerTenantConfig::new()
///     .with_data_dir("/var/lib/atrium")
///     .with_max_pools(50)
///     .with_auto_create();
///
/// assert!(matches!(config.storage, StorageMode::File { .. }));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabasePerTenantConfig {
    /// Where databases are kept.
    #[serde(default = "default_storage")]
    pub storage: StorageMode,

    /// Maximum number of tenant pools to keep open.
    ///
    /// If exceeded, least recently used pools are closed.
    #[serde(default)]
    pub max_pools: Option<usize>,

    /// Minimum idle connections per tenant pool.
    #[serde(default = "default_min_connections")]
    pub min_connections_per_pool: u32,

    /// Maximum connections per tenant pool.
    #[serde(default = "default_max_connections")]
    pub max_connections_per_pool: u32,

    /// Maximum length of the tenant part of a database name before hashing.
    #[serde(default = "default_max_tenant_id_length")]
    pub max_tenant_id_length: usize,

    /// Allowed tenant ids (regex pattern).
    #[serde(default = "default_tenant_id_pattern")]
    pub tenant_id_pattern: String,

    /// Whether a missing tenant database may be created on first bind.
    #[serde(default)]
    pub auto_create_database: bool,

    /// Database name prefix.
    #[serde(default = "default_database_prefix")]
    pub database_prefix: String,

    /// Database name suffix.
    #[serde(default)]
    pub database_suffix: String,

    /// Name of the central registry database.
    #[serde(default = "default_central_database")]
    pub central_database: String,
}

fn default_storage() -> StorageMode {
    StorageMode::File {
        data_dir: PathBuf::from("./data"),
    }
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    10
}

fn default_max_tenant_id_length() -> usize {
    32
}

fn default_tenant_id_pattern() -> String {
    r"^[a-z0-9][a-z0-9_-]*$".to_string()
}

fn default_database_prefix() -> String {
    "tenant_".to_string()
}

fn default_central_database() -> String {
    "atrium_central".to_string()
}

impl Default for DatabasePerTenantConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            max_pools: Some(100),
            min_connections_per_pool: default_min_connections(),
            max_connections_per_pool: default_max_connections(),
            max_tenant_id_length: default_max_tenant_id_length(),
            tenant_id_pattern: default_tenant_id_pattern(),
            auto_create_database: false,
            database_prefix: default_database_prefix(),
            database_suffix: String::new(),
            central_database: default_central_database(),
        }
    }
}

impl DatabasePerTenantConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            storage: StorageMode::Memory,
            ..Self::default()
        }
    }

    /// Keeps database files under `dir`.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage = StorageMode::File {
            data_dir: dir.into(),
        };
        self
    }

    /// Enables auto-creation of databases.
    pub fn with_auto_create(mut self) -> Self {
        self.auto_create_database = true;
        self
    }

    /// Sets the maximum number of pools.
    pub fn with_max_pools(mut self, max: usize) -> Self {
        self.max_pools = Some(max);
        self
    }

    /// Sets the database prefix.
    pub fn with_database_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.database_prefix = prefix.into();
        self
    }
}

/// Database-per-tenant tenancy strategy implementation.
///
/// # Database Naming
///
/// ```text
/// tenant_id: "north-campus"
/// database:  "tenant_north-campus"      (default prefix, no suffix)
/// file:      "<data_dir>/tenant_north-campus.db"
/// ```
///
/// Ids longer than `max_tenant_id_length` are replaced by a stable hash.
/// Two different tenant ids never share a database name.
///
/// # Pool Tracking
///
/// The strategy records when each tenant's pool was last used so that the
/// router can close the least recently used pools once `max_pools` is
/// exceeded.
#[derive(Debug, Clone)]
pub struct DatabasePerTenantStrategy {
    config: DatabasePerTenantConfig,
    tenant_pattern: regex::Regex,
    /// Distinguishes in-memory databases of separate strategy instances.
    memory_namespace: String,
    /// Last access time per tenant pool.
    pool_access_times: Arc<RwLock<HashMap<String, Instant>>>,
}

impl DatabasePerTenantStrategy {
    /// Creates a new database-per-tenant strategy with the given configuration.
    pub fn new(config: DatabasePerTenantConfig) -> Result<Self, regex::Error> {
        let tenant_pattern = regex::Regex::new(&config.tenant_id_pattern)?;
        Ok(Self {
            config,
            tenant_pattern,
            memory_namespace: uuid::Uuid::new_v4().simple().to_string(),
            pool_access_times: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DatabasePerTenantConfig {
        &self.config
    }

    /// Returns `true` when stores are kept in memory.
    pub fn is_memory(&self) -> bool {
        self.config.storage == StorageMode::Memory
    }

    /// Generates the database name for a tenant.
    pub fn database_name(&self, tenant_id: &TenantId) -> String {
        let sanitized = self.sanitize_tenant_id(tenant_id);
        format!(
            "{}{}{}",
            self.config.database_prefix, sanitized, self.config.database_suffix
        )
    }

    fn location_for(&self, database_name: &str) -> StoreLocation {
        match &self.config.storage {
            StorageMode::File { data_dir } => {
                StoreLocation::File(data_dir.join(format!("{}.db", database_name)))
            }
            StorageMode::Memory => StoreLocation::Memory(format!(
                "file:{}_{}?mode=memory&cache=shared",
                self.memory_namespace, database_name
            )),
        }
    }

    /// Records access to a tenant's pool for LRU tracking.
    pub fn record_pool_access(&self, tenant_id: &TenantId) {
        let mut times = self.pool_access_times.write();
        times.insert(tenant_id.as_str().to_string(), Instant::now());
    }

    /// Returns tenants that should be evicted based on LRU.
    pub fn tenants_to_evict(&self) -> Vec<String> {
        let times = self.pool_access_times.read();
        let max_pools = self.config.max_pools.unwrap_or(usize::MAX);

        if times.len() <= max_pools {
            return Vec::new();
        }

        let mut entries: Vec<_> = times.iter().collect();
        entries.sort_by_key(|(_, time)| *time);

        let to_evict = times.len() - max_pools;
        entries
            .into_iter()
            .take(to_evict)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Removes a tenant from the access tracking.
    pub fn remove_pool_tracking(&self, tenant_id: &str) {
        let mut times = self.pool_access_times.write();
        times.remove(tenant_id);
    }

    /// Maps a tenant ID to the tenant part of its database name.
    ///
    /// Short slugs are used verbatim, so distinct slugs give distinct names.
    /// Anything else is hashed into `h.<hex>`; the `.` never occurs in a
    /// verbatim name, so hashed and verbatim names cannot meet.
    fn sanitize_tenant_id(&self, tenant_id: &TenantId) -> String {
        let id = tenant_id.as_str();
        let verbatim = !id.is_empty()
            && id.len() <= self.config.max_tenant_id_length
            && id
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');

        if verbatim {
            id.to_string()
        } else {
            self.hash_tenant_id(tenant_id)
        }
    }

    /// Generates a stable hash for a tenant ID.
    ///
    /// FNV-1a, because `DefaultHasher` output may change between Rust releases
    /// and these names must stay valid across restarts.
    fn hash_tenant_id(&self, tenant_id: &TenantId) -> String {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        let hash = tenant_id
            .as_str()
            .bytes()
            .fold(OFFSET, |acc, b| (acc ^ u64::from(b)).wrapping_mul(PRIME));
        format!("h.{:016x}", hash)
    }
}

impl StoreLocator for DatabasePerTenantStrategy {
    fn locate(&self, tenant_id: &TenantId) -> StoreLocation {
        self.location_for(&self.database_name(tenant_id))
    }

    fn validate(&self, tenant_id: &TenantId) -> Result<(), TenantValidationError> {
        let id = tenant_id.as_str();

        if !self.tenant_pattern.is_match(id) {
            return Err(TenantValidationError {
                tenant_id: id.to_string(),
                reason: format!(
                    "tenant ID does not match required pattern for database names: {}",
                    self.config.tenant_id_pattern
                ),
            });
        }

        if self.database_name(tenant_id) == self.config.central_database {
            return Err(TenantValidationError {
                tenant_id: id.to_string(),
                reason: "tenant ID maps onto the central database".to_string(),
            });
        }

        Ok(())
    }

    fn central_store(&self) -> StoreLocation {
        self.location_for(&self.config.central_database)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn strategy() -> DatabasePerTenantStrategy {
        DatabasePerTenantStrategy::new(DatabasePerTenantConfig::default()).unwrap()
    }

    #[test]
    fn test_database_per_tenant_config_default() {
        let config = DatabasePerTenantConfig::default();
        assert_eq!(config.max_pools, Some(100));
        assert_eq!(config.database_prefix, "tenant_");
        assert!(!config.auto_create_database);
    }

    #[test]
    fn test_database_per_tenant_config_builder() {
        let config = DatabasePerTenantConfig::new()
            .with_max_pools(50)
            .with_database_prefix("db_")
            .with_auto_create();

        assert_eq!(config.max_pools, Some(50));
        assert_eq!(config.database_prefix, "db_");
        assert!(config.auto_create_database);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: DatabasePerTenantConfig =
            serde_json::from_str(r#"{"storage": {"type": "memory"}}"#).unwrap();
        assert_eq!(config.storage, StorageMode::Memory);
        assert_eq!(config.central_database, "atrium_central");
    }

    #[test]
    fn test_database_name_generation() {
        let strategy = strategy();
        assert_eq!(strategy.database_name(&TenantId::new("acme")), "tenant_acme");
        assert_eq!(
            strategy.database_name(&TenantId::new("north-campus")),
            "tenant_north-campus"
        );
    }

    #[test]
    fn test_dash_and_underscore_ids_get_distinct_names() {
        let strategy = strategy();
        let dashed = TenantId::new("a-b");
        let underscored = TenantId::new("a_b");

        assert_ne!(strategy.database_name(&dashed), strategy.database_name(&underscored));
        assert_ne!(strategy.locate(&dashed), strategy.locate(&underscored));
    }

    #[test]
    fn test_hashed_names_never_match_verbatim_ids() {
        let strategy = strategy();
        let long = TenantId::new("a".repeat(40));
        let hashed = strategy.database_name(&long);
        let hex = hashed.trim_start_matches("tenant_h.");

        // A slug spelling out the hash still gets its own name.
        for lookalike in [format!("h-{hex}"), format!("h_{hex}"), format!("t_{hex}")] {
            assert_ne!(strategy.database_name(&TenantId::new(lookalike)), hashed);
        }
    }

    #[test]
    fn test_long_ids_are_hashed_stably() {
        let strategy = strategy();
        let long = TenantId::new("a".repeat(40));
        let name = strategy.database_name(&long);
        assert!(name.starts_with("tenant_h."));
        assert_eq!(name, strategy.database_name(&long));

        let other = DatabasePerTenantStrategy::new(DatabasePerTenantConfig::default()).unwrap();
        assert_eq!(name, other.database_name(&long));
    }

    #[test]
    fn test_file_location() {
        let strategy = DatabasePerTenantStrategy::new(
            DatabasePerTenantConfig::new().with_data_dir("/srv/atrium"),
        )
        .unwrap();

        assert_eq!(
            strategy.locate(&TenantId::new("acme")),
            StoreLocation::File(PathBuf::from("/srv/atrium/tenant_acme.db"))
        );
        assert_eq!(
            strategy.central_store(),
            StoreLocation::File(PathBuf::from("/srv/atrium/atrium_central.db"))
        );
    }

    #[test]
    fn test_memory_locations_are_private_per_strategy() {
        let a = DatabasePerTenantStrategy::new(DatabasePerTenantConfig::in_memory()).unwrap();
        let b = DatabasePerTenantStrategy::new(DatabasePerTenantConfig::in_memory()).unwrap();
        let tenant = TenantId::new("acme");

        assert!(a.is_memory());
        assert_eq!(a.locate(&tenant), a.locate(&tenant));
        assert_ne!(a.locate(&tenant), b.locate(&tenant));
        assert_ne!(a.locate(&tenant), a.locate(&TenantId::new("globex")));
    }

    #[test]
    fn test_tenant_validation() {
        let strategy = strategy();
        assert!(strategy.validate(&TenantId::new("acme")).is_ok());
        assert!(strategy.validate(&TenantId::new("tenant_one")).is_ok());
        assert!(strategy.validate(&TenantId::new("Acme")).is_err());
        assert!(strategy.validate(&TenantId::new("has space")).is_err());
    }

    #[test]
    fn test_pool_access_tracking() {
        let strategy = DatabasePerTenantStrategy::new(
            DatabasePerTenantConfig::default().with_max_pools(1),
        )
        .unwrap();

        strategy.record_pool_access(&TenantId::new("tenant1"));
        std::thread::sleep(Duration::from_millis(2));
        strategy.record_pool_access(&TenantId::new("tenant2"));

        assert_eq!(strategy.tenants_to_evict(), vec!["tenant1".to_string()]);

        strategy.remove_pool_tracking("tenant1");
        assert!(strategy.tenants_to_evict().is_empty());
    }
}
