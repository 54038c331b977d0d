//! Application state for the Atrium REST API.
//!
//! The state is shared by every handler. It holds the central registry, the
//! host resolver built over it, the tenant connection router and the audit
//! recorder used by lifecycle transitions.

use std::sync::Arc;

use anyhow::Context;
use atrium_persistence::backends::sqlite::{SqliteStoreConfig, TenantConnectionRouter};
use atrium_persistence::entity::EntityCatalog;
use atrium_persistence::lifecycle::{AuditTrailRecorder, TrashLifecycleManager};
use atrium_persistence::strategy::DatabasePerTenantStrategy;
use atrium_persistence::tenant::{CentralRegistry, TenantResolver};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::RestResult;

/// Shared application state for the REST API.
///
/// # Example
///
/// ```rust,ignore
/// use atrium_rest::{AppState, ServerConfig};
///
/// let state = AppState::open(&ServerConfig::for_testing()).await?;
/// let app = atrium_rest::create_app(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    router: Arc<TenantConnectionRouter>,
    registry: Arc<dyn CentralRegistry>,
    resolver: TenantResolver,
    recorder: AuditTrailRecorder,
    config: Arc<ServerConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("router", &self.router)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates state from an already built router and registry.
    pub fn new(
        router: Arc<TenantConnectionRouter>,
        registry: Arc<dyn CentralRegistry>,
        config: ServerConfig,
    ) -> Self {
        let resolver = TenantResolver::new(Arc::clone(&registry));
        Self {
            router,
            registry,
            resolver,
            recorder: AuditTrailRecorder::default(),
            config: Arc::new(config),
        }
    }

    /// Opens the stores described by `config`.
    ///
    /// Loads the entity catalog, creates the router, opens the central
    /// registry and designates the configured central domains.
    pub async fn open(config: &ServerConfig) -> anyhow::Result<Self> {
        let catalog = match &config.entity_catalog {
            Some(path) => EntityCatalog::load(path)
                .with_context(|| format!("Failed to load entity catalog {}", path.display()))?,
            None => EntityCatalog::builtin(),
        };

        let strategy = DatabasePerTenantStrategy::new(config.tenancy_config())
            .context("Invalid tenant id pattern")?;
        let router = TenantConnectionRouter::new(
            strategy,
            SqliteStoreConfig::default(),
            Arc::new(catalog),
        )
        .context("Failed to create tenant connection router")?;
        let registry = router
            .open_registry()
            .context("Failed to open central registry")?;

        for domain in config.central_domain_list() {
            registry
                .designate_central_domain(&domain)
                .await
                .with_context(|| format!("Failed to designate central domain {}", domain))?;
        }

        info!(
            entities = router.catalog().len(),
            in_memory = config.in_memory,
            "Opened Atrium stores"
        );

        Ok(Self::new(Arc::new(router), Arc::new(registry), config.clone()))
    }

    /// Replaces the audit recorder (for example with a fixed clock).
    pub fn with_recorder(mut self, recorder: AuditTrailRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// The tenant connection router.
    pub fn router(&self) -> &TenantConnectionRouter {
        &self.router
    }

    /// The central registry.
    pub fn registry(&self) -> &Arc<dyn CentralRegistry> {
        &self.registry
    }

    /// The host resolver.
    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    /// The entity types this server exposes.
    pub fn catalog(&self) -> &EntityCatalog {
        self.router.catalog()
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Builds the lifecycle manager for `entity`.
    ///
    /// Fails with `UnknownEntity` if the catalog has no such type.
    pub fn manager(&self, entity: &str) -> RestResult<TrashLifecycleManager> {
        let definition = self.catalog().get(entity)?.clone();
        Ok(TrashLifecycleManager::new(definition, self.recorder.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let state = AppState::open(&ServerConfig::for_testing()).await.unwrap();

        assert_eq!(
            state.registry().central_domains().await.unwrap(),
            vec!["admin.localhost".to_string()]
        );
        assert!(!state.catalog().is_empty());
        assert_eq!(state.config().default_page_size, 10);
    }

    #[tokio::test]
    async fn test_manager_for_unknown_entity() {
        let state = AppState::open(&ServerConfig::for_testing()).await.unwrap();

        assert!(state.manager("clients").is_ok());
        let err = state.manager("widgets").unwrap_err();
        assert_eq!(err.error_code(), "unknown_entity");
    }
}
