//! Service configuration
//!
//! Built-in defaults, overridden by `USERS_*` environment variables
//! (`USERS_PORT=8080`, `USERS_MAX_PAGE_SIZE=50`, ...). Database settings are
//! read separately by `common::database::DatabaseConfig`.

use anyhow::{Context, Result};
use ::config::{Config, Environment};
use serde::Deserialize;

use crate::models::{PageRequest, PaginationQuery};

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Lifetime of issued tokens
    pub jwt_expiry_seconds: u64,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            jwt_expiry_seconds: 3600,
            default_page_size: 20,
            max_page_size: 100,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load the configuration from defaults and the environment
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let config = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("jwt_expiry_seconds", defaults.jwt_expiry_seconds)?
            .set_default("default_page_size", i64::from(defaults.default_page_size))?
            .set_default("max_page_size", i64::from(defaults.max_page_size))?
            .set_default("log_level", defaults.log_level)?
            .add_source(Environment::with_prefix("USERS").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        let loaded: Self = config
            .try_deserialize()
            .context("Invalid configuration")?;

        if loaded.max_page_size == 0 {
            anyhow::bail!("max_page_size must be at least 1");
        }

        Ok(loaded)
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Page request for the given query, applying the configured size bounds
    pub fn page_request(&self, query: PaginationQuery) -> PageRequest {
        PageRequest::new(
            query.page.unwrap_or(0),
            query.size.unwrap_or(self.default_page_size),
            self.max_page_size,
        )
    }
}
