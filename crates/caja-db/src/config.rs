//! # POS Configuration
//!
//! Configuration for the database and tenant resolution.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAJA_DATABASE_PATH=/var/lib/caja/caja.db                           │
//! │     CAJA_MAX_CONNECTIONS=8                                             │
//! │     CAJA_BUSY_TIMEOUT_SECS=10                                          │
//! │     CAJA_DEFAULT_TENANT=first_active                                   │
//! │     CAJA_TENANT_HEADER=X-Tenant-ID                                     │
//! │                                                                         │
//! │  2. TOML Config File (path given by the caller)                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "caja.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [tenancy]
//! default_tenant = "first_active"   # first_active | none | <tenant id>
//! tenant_header = "X-Tenant-ID"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Default Tenant Policy
// =============================================================================

/// What to do when a request names no tenant (no subdomain, no header).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DefaultTenant {
    /// The first active tenant ordered by name. Suits single-store installs.
    #[default]
    FirstActive,

    /// Leave the request unresolved.
    Disabled,

    /// Always this tenant id (must be active).
    Fixed(String),
}

impl From<String> for DefaultTenant {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "first_active" | "first-active" => DefaultTenant::FirstActive,
            "none" | "disabled" => DefaultTenant::Disabled,
            _ => DefaultTenant::Fixed(value.trim().to_string()),
        }
    }
}

impl From<DefaultTenant> for String {
    fn from(value: DefaultTenant) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DefaultTenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultTenant::FirstActive => write!(f, "first_active"),
            DefaultTenant::Disabled => write!(f, "none"),
            DefaultTenant::Fixed(id) => write!(f, "{}", id),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("caja.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancySettings {
    #[serde(default)]
    pub default_tenant: DefaultTenant,

    /// Header carrying an explicit tenant id.
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,
}

fn default_tenant_header() -> String {
    caja_core::TENANT_HEADER.to_string()
}

impl Default for TenancySettings {
    fn default() -> Self {
        TenancySettings {
            default_tenant: DefaultTenant::default(),
            tenant_header: default_tenant_header(),
        }
    }
}

// =============================================================================
// PosConfig
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PosConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub tenancy: TenancySettings,
}

impl PosConfig {
    /// Loads configuration from defaults, then `config_path` (if it exists),
    /// then `CAJA_*` environment variables.
    pub fn load(config_path: Option<&Path>) -> DbResult<Self> {
        let mut config = PosConfig::default();

        if let Some(path) = config_path {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::Config("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(DbError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.tenancy.tenant_header.trim().is_empty() {
            return Err(DbError::Config("tenancy.tenant_header must not be empty".into()));
        }
        Ok(())
    }

    /// Applies overrides from `lookup` (the process environment in `load`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CAJA_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("CAJA_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid CAJA_MAX_CONNECTIONS"),
            }
        }

        if let Some(secs) = lookup("CAJA_BUSY_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_secs = n,
                Err(_) => warn!(value = %secs, "Ignoring invalid CAJA_BUSY_TIMEOUT_SECS"),
            }
        }

        if let Some(policy) = lookup("CAJA_DEFAULT_TENANT") {
            self.tenancy.default_tenant = DefaultTenant::from(policy);
        }

        if let Some(header) = lookup("CAJA_TENANT_HEADER") {
            self.tenancy.tenant_header = header;
        }
    }

    /// Pool configuration derived from the `[database]` section.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
    }

    pub fn default_tenant(&self) -> &DefaultTenant {
        &self.tenancy.default_tenant
    }

    pub fn tenant_header(&self) -> &str {
        &self.tenancy.tenant_header
    }
}
