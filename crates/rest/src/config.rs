//! Server configuration for the Atrium REST API.
//!
//! Every option can be given on the command line or through an environment
//! variable.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ATRIUM_PORT` | 8080 | Server port |
//! | `ATRIUM_HOST` | 127.0.0.1 | Host to bind |
//! | `ATRIUM_LOG_LEVEL` | info | Log level |
//! | `ATRIUM_MAX_BODY_SIZE` | 1048576 | Max request body (bytes) |
//! | `ATRIUM_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `ATRIUM_ENABLE_CORS` | true | Enable CORS |
//! | `ATRIUM_CORS_ORIGINS` | * | Allowed origins |
//! | `ATRIUM_CORS_METHODS` | GET,POST,PUT,DELETE,OPTIONS | Allowed methods |
//! | `ATRIUM_CORS_HEADERS` | Content-Type,Accept,X-Actor-Id,X-Request-Id | Allowed headers |
//! | `ATRIUM_ENABLE_REQUEST_ID` | true | Generate and echo `X-Request-Id` |
//! | `ATRIUM_DATA_DIR` | ./data | Directory holding the SQLite stores |
//! | `ATRIUM_IN_MEMORY` | false | Keep every store in memory |
//! | `ATRIUM_AUTO_PROVISION` | false | Create a missing tenant store on first request |
//! | `ATRIUM_MAX_POOLS` | - | Maximum open tenant pools |
//! | `ATRIUM_CENTRAL_DOMAINS` | localhost | Comma separated administrative hosts |
//! | `ATRIUM_TRUST_FORWARDED_HOST` | false | Resolve tenants from `X-Forwarded-Host` |
//! | `ATRIUM_ENTITY_CATALOG` | - | JSON file with entity definitions |
//! | `ATRIUM_DEFAULT_PAGE_SIZE` | 20 | Default listing page size |
//! | `ATRIUM_MAX_PAGE_SIZE` | 100 | Maximum listing page size |
//!
//! # Example
//!
//! ```rust
//! use atrium_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     central_domains: "admin.example.com".to_string(),
//!     ..Default::default()
//! };
//! assert_eq!(config.central_domain_list(), vec!["admin.example.com"]);
//! ```

use std::path::PathBuf;

use atrium_persistence::strategy::DatabasePerTenantConfig;
use clap::Parser;

/// Configuration for the Atrium server.
#[derive(Debug, Clone, Parser)]
#[command(name = "atrium")]
#[command(about = "Multi-tenant entity lifecycle server")]
pub struct ServerConfig {
    /// Server port.
    #[arg(short, long, env = "ATRIUM_PORT", default_value = "8080")]
    pub port: u16,

    /// Host to bind.
    #[arg(long, env = "ATRIUM_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "ATRIUM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "ATRIUM_MAX_BODY_SIZE", default_value = "1048576")]
    pub max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "ATRIUM_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "ATRIUM_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma separated, or `*`).
    #[arg(long, env = "ATRIUM_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma separated, or `*`).
    #[arg(long, env = "ATRIUM_CORS_METHODS", default_value = "GET,POST,PUT,DELETE,OPTIONS")]
    pub cors_methods: String,

    /// Allowed CORS headers (comma separated, or `*`).
    #[arg(
        long,
        env = "ATRIUM_CORS_HEADERS",
        default_value = "Content-Type,Accept,X-Actor-Id,X-Request-Id"
    )]
    pub cors_headers: String,

    /// Generate an `X-Request-Id` when the client sends none, and echo it back.
    #[arg(long, env = "ATRIUM_ENABLE_REQUEST_ID", default_value = "true")]
    pub enable_request_id: bool,

    /// Directory holding the central registry and tenant databases.
    #[arg(long, env = "ATRIUM_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Keep every store in memory. Data is lost on exit.
    #[arg(long, env = "ATRIUM_IN_MEMORY", default_value = "false")]
    pub in_memory: bool,

    /// Create a tenant's database on its first request instead of failing.
    #[arg(long, env = "ATRIUM_AUTO_PROVISION", default_value = "false")]
    pub auto_provision: bool,

    /// Maximum number of tenant pools kept open.
    #[arg(long, env = "ATRIUM_MAX_POOLS")]
    pub max_pools: Option<usize>,

    /// Hosts that serve the administrative routes (comma separated).
    #[arg(long, env = "ATRIUM_CENTRAL_DOMAINS", default_value = "localhost")]
    pub central_domains: String,

    /// Resolve tenants from `X-Forwarded-Host` when present.
    #[arg(long, env = "ATRIUM_TRUST_FORWARDED_HOST", default_value = "false")]
    pub trust_forwarded_host: bool,

    /// JSON file with the entity catalog. The built-in catalog is used if unset.
    #[arg(long, env = "ATRIUM_ENTITY_CATALOG")]
    pub entity_catalog: Option<PathBuf>,

    /// Default page size for listings.
    #[arg(long, env = "ATRIUM_DEFAULT_PAGE_SIZE", default_value = "20")]
    pub default_page_size: u32,

    /// Maximum page size for listings.
    #[arg(long, env = "ATRIUM_MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            max_body_size: 1024 * 1024,
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PUT,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Accept,X-Actor-Id,X-Request-Id".to_string(),
            enable_request_id: true,
            data_dir: PathBuf::from("./data"),
            in_memory: false,
            auto_provision: false,
            max_pools: None,
            central_domains: "localhost".to_string(),
            trust_forwarded_host: false,
            entity_catalog: None,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl ServerConfig {
    /// Parses the configuration from arguments and environment, falling back
    /// to defaults if parsing fails.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address string.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured central domains, trimmed, without empty entries.
    pub fn central_domain_list(&self) -> Vec<String> {
        self.central_domains
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from)
            .collect()
    }

    /// Builds the tenant store configuration.
    pub fn tenancy_config(&self) -> DatabasePerTenantConfig {
        let mut config = if self.in_memory {
            DatabasePerTenantConfig::in_memory()
        } else {
            DatabasePerTenantConfig::new().with_data_dir(&self.data_dir)
        };
        if self.auto_provision {
            config = config.with_auto_create();
        }
        if let Some(max) = self.max_pools {
            config = config.with_max_pools(max);
        }
        config
    }

    /// Validates the configuration.
    ///
    /// Returns every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if self.max_pools == Some(0) {
            errors.push("Max pools cannot be 0".to_string());
        }

        if self.central_domain_list().is_empty() {
            errors.push("At least one central domain is required".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Stores live in memory and CORS and request ids are off.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            max_body_size: 1024 * 1024,
            request_timeout: 5,
            enable_cors: false,
            cors_origins: "*".to_string(),
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            enable_request_id: false,
            data_dir: PathBuf::from("./data"),
            in_memory: true,
            auto_provision: false,
            max_pools: None,
            central_domains: "admin.localhost".to_string(),
            trust_forwarded_host: false,
            entity_catalog: None,
            default_page_size: 10,
            max_page_size: 50,
        }
    }
}
