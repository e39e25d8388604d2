//! Configuration management for the café costing platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with CAFE__ prefix

use chrono::{FixedOffset, Offset, Utc};
use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::validation::clamp_limit;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Accounting and reporting settings
    pub accounting: AccountingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountingConfig {
    /// ISO currency code reported alongside money values
    pub currency: String,

    /// Business time zone as minutes east of UTC; decides where a day starts
    pub utc_offset_minutes: i32,

    /// Movement list size when `?limit=` is absent
    pub default_movement_limit: i64,

    /// Upper bound for `?limit=` on movement lists
    pub max_movement_limit: i64,

    /// Top/worst item count when `?limit=` is absent
    pub default_ranking_limit: i64,

    /// Upper bound for `?limit=` on rankings and snapshot history
    pub max_ranking_limit: i64,
}

impl AccountingConfig {
    /// Business time zone, falling back to UTC on an out-of-range offset
    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Page size for movement lists
    pub fn movement_limit(&self, requested: Option<i64>) -> i64 {
        clamp_limit(requested, self.default_movement_limit, self.max_movement_limit)
    }

    /// Row count for rankings and snapshot history
    pub fn ranking_limit(&self, requested: Option<i64>) -> i64 {
        clamp_limit(requested, self.default_ranking_limit, self.max_ranking_limit)
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("CAFE_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("accounting.currency", "SAR")?
            .set_default("accounting.utc_offset_minutes", 180)?
            .set_default("accounting.default_movement_limit", 50)?
            .set_default("accounting.max_movement_limit", 500)?
            .set_default("accounting.default_ranking_limit", 10)?
            .set_default("accounting.max_ranking_limit", 100)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CAFE__ prefix)
            .add_source(
                Environment::with_prefix("CAFE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            currency: "SAR".to_string(),
            utc_offset_minutes: 180,
            default_movement_limit: 50,
            max_movement_limit: 500,
            default_ranking_limit: 10,
            max_ranking_limit: 100,
        }
    }
}
