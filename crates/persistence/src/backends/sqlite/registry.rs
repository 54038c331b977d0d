//! SQLite implementation of the central registry.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::info;

use crate::error::{BackendError, StorageError, StorageResult, TenantError, ValidationError};
use crate::strategy::StoreLocation;
use crate::tenant::{CentralRegistry, DomainBinding, NewTenant, Tenant, TenantId, normalize_host};

use super::pool::{PoolSize, SqliteStoreConfig, build_pool};
use super::schema;

/// Central registry stored in its own SQLite database.
pub struct SqliteCentralRegistry {
    pool: Pool<SqliteConnectionManager>,
    location: StoreLocation,
}

impl Debug for SqliteCentralRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCentralRegistry")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl SqliteCentralRegistry {
    /// Opens (creating if needed) the registry at `location`.
    pub fn open(location: StoreLocation, config: &SqliteStoreConfig) -> StorageResult<Self> {
        if let StoreLocation::File(path) = &location {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(BackendError::from)?;
            }
        }

        let pool = build_pool(
            &location,
            config,
            PoolSize {
                min_idle: 1,
                max_size: 4,
            },
        )?;
        let registry = Self { pool, location };
        let conn = registry.get_connection()?;
        schema::initialize_central_schema(&conn)?;
        drop(conn);
        Ok(registry)
    }

    /// Creates a private in-memory registry.
    pub fn in_memory() -> StorageResult<Self> {
        let uri = format!(
            "file:central_{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4().simple()
        );
        Self::open(StoreLocation::Memory(uri), &SqliteStoreConfig::default())
    }

    /// Where the registry lives.
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    fn get_connection(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })
        })
    }
}

fn normalized_domain(domain: &str) -> StorageResult<String> {
    normalize_host(domain).ok_or_else(|| {
        ValidationError::InvalidIdentifier {
            kind: "domain",
            value: domain.to_string(),
            reason: "must not be empty".to_string(),
        }
        .into()
    })
}

pub(super) fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StorageError::Backend(BackendError::SerializationError {
                message: format!("invalid timestamp '{}': {}", value, e),
            })
        })
}

fn load_tenant(conn: &Connection, id: &str) -> StorageResult<Option<Tenant>> {
    let row = conn
        .query_row(
            "SELECT id, name, config, active, created_at FROM tenants WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((id, name, config, active, created_at)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT domain FROM domains WHERE tenant_id = ?1 ORDER BY domain")?;
    let domains = stmt
        .query_map([&id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Tenant {
        id: TenantId::new(id),
        name,
        domains,
        config: serde_json::from_str::<Value>(&config)?,
        active,
        created_at: parse_timestamp(&created_at)?,
    }))
}

fn require_tenant(conn: &Connection, id: &TenantId) -> StorageResult<Tenant> {
    load_tenant(conn, id.as_str())?.ok_or_else(|| {
        TenantError::UnknownTenant {
            tenant_id: id.clone(),
        }
        .into()
    })
}

/// Returns the owner of a domain: `Some(None)` for central, `None` if free.
fn domain_owner(conn: &Connection, domain: &str) -> StorageResult<Option<Option<String>>> {
    Ok(conn
        .query_row(
            "SELECT tenant_id FROM domains WHERE domain = ?1",
            [domain],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?)
}

#[async_trait]
impl CentralRegistry for SqliteCentralRegistry {
    async fn create_tenant(&self, tenant: NewTenant) -> StorageResult<Tenant> {
        let id = TenantId::parse(tenant.id.as_str())?;
        let domains = tenant
            .domains
            .iter()
            .map(|d| normalized_domain(d))
            .collect::<StorageResult<Vec<_>>>()?;
        if domains.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "domains".to_string(),
            }
            .into());
        }

        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        if load_tenant(&tx, id.as_str())?.is_some() {
            return Err(TenantError::AlreadyExists { tenant_id: id }.into());
        }

        tx.execute(
            "INSERT INTO tenants (id, name, config, active, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                id.as_str(),
                tenant.name,
                serde_json::to_string(&tenant.config)?,
                Utc::now().to_rfc3339()
            ],
        )?;

        for domain in &domains {
            if domain_owner(&tx, domain)?.is_some() {
                return Err(TenantError::DomainAlreadyAssigned {
                    domain: domain.clone(),
                }
                .into());
            }
            tx.execute(
                "INSERT INTO domains (domain, tenant_id) VALUES (?1, ?2)",
                params![domain, id.as_str()],
            )?;
        }

        let created = require_tenant(&tx, &id)?;
        tx.commit()?;

        info!(tenant_id = %id, domains = ?domains, "Registered tenant");
        Ok(created)
    }

    async fn get_tenant(&self, id: &TenantId) -> StorageResult<Option<Tenant>> {
        let conn = self.get_connection()?;
        load_tenant(&conn, id.as_str())
    }

    async fn list_tenants(&self) -> StorageResult<Vec<Tenant>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare("SELECT id FROM tenants ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tenants = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tenant) = load_tenant(&conn, &id)? {
                tenants.push(tenant);
            }
        }
        Ok(tenants)
    }

    async fn set_active(&self, id: &TenantId, active: bool) -> StorageResult<Tenant> {
        let conn = self.get_connection()?;
        let updated = conn.execute(
            "UPDATE tenants SET active = ?2 WHERE id = ?1",
            params![id.as_str(), active],
        )?;
        if updated == 0 {
            return Err(TenantError::UnknownTenant {
                tenant_id: id.clone(),
            }
            .into());
        }

        info!(tenant_id = %id, active, "Changed tenant activation");
        require_tenant(&conn, id)
    }

    async fn attach_domain(&self, id: &TenantId, domain: &str) -> StorageResult<Tenant> {
        let domain = normalized_domain(domain)?;
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        require_tenant(&tx, id)?;
        match domain_owner(&tx, &domain)? {
            Some(Some(owner)) if owner == id.as_str() => {}
            Some(_) => return Err(TenantError::DomainAlreadyAssigned { domain }.into()),
            None => {
                tx.execute(
                    "INSERT INTO domains (domain, tenant_id) VALUES (?1, ?2)",
                    params![domain, id.as_str()],
                )?;
            }
        }

        let tenant = require_tenant(&tx, id)?;
        tx.commit()?;
        info!(tenant_id = %id, domain = %domain, "Attached domain");
        Ok(tenant)
    }

    async fn detach_domain(&self, id: &TenantId, domain: &str) -> StorageResult<Tenant> {
        let domain = normalized_domain(domain)?;
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let tenant = require_tenant(&tx, id)?;
        if !tenant.owns_domain(&domain) {
            return Err(TenantError::DomainNotAttached {
                tenant_id: id.clone(),
                domain,
            }
            .into());
        }
        if tenant.domains.len() == 1 {
            return Err(TenantError::LastDomain {
                tenant_id: id.clone(),
                domain,
            }
            .into());
        }

        tx.execute(
            "DELETE FROM domains WHERE domain = ?1 AND tenant_id = ?2",
            params![domain, id.as_str()],
        )?;
        let tenant = require_tenant(&tx, id)?;
        tx.commit()?;

        info!(tenant_id = %id, domain = %domain, "Detached domain");
        Ok(tenant)
    }

    async fn designate_central_domain(&self, domain: &str) -> StorageResult<()> {
        let domain = normalized_domain(domain)?;
        let conn = self.get_connection()?;

        match domain_owner(&conn, &domain)? {
            Some(None) => Ok(()),
            Some(Some(_)) => Err(TenantError::DomainAlreadyAssigned { domain }.into()),
            None => {
                conn.execute(
                    "INSERT INTO domains (domain, tenant_id) VALUES (?1, NULL)",
                    [&domain],
                )?;
                info!(domain = %domain, "Designated central domain");
                Ok(())
            }
        }
    }

    async fn central_domains(&self) -> StorageResult<Vec<String>> {
        let conn = self.get_connection()?;
        let mut stmt =
            conn.prepare("SELECT domain FROM domains WHERE tenant_id IS NULL ORDER BY domain")?;
        let domains = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(domains)
    }

    async fn find_domain(&self, domain: &str) -> StorageResult<Option<DomainBinding>> {
        let Some(domain) = normalize_host(domain) else {
            return Ok(None);
        };
        let conn = self.get_connection()?;

        match domain_owner(&conn, &domain)? {
            None => Ok(None),
            Some(None) => Ok(Some(DomainBinding::Central)),
            Some(Some(tenant_id)) => Ok(load_tenant(&conn, &tenant_id)?.map(DomainBinding::Tenant)),
        }
    }

    async fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
