//! Server settings
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults
//! 2. `config/{environment}.toml`
//! 3. `FMS__SECTION__KEY` environment variables
//!
//! `FMS_ENVIRONMENT` picks the file and defaults to `development`.

use config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::{
    net::{AddrParseError, SocketAddr},
    time::Duration,
};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// development, test or production
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Verification settings for tokens issued by the auth provider
    pub jwt: JwtConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Shared HS256 secret of the auth provider
    pub secret: String,
    /// Expected `aud` claim, if the provider sets one
    pub audience: Option<String>,
}

fn defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("environment", environment)?
        .set_default("server.port", 3000)?
        .set_default("server.host", "0.0.0.0")?
        .set_default("database.max_connections", 10)?
        .set_default("database.min_connections", 2)?
        .set_default("database.acquire_timeout_secs", 30)
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FMS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config: Self = defaults(&environment)?
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(
                Environment::with_prefix("FMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.check()?;
        Ok(config)
    }

    /// Settings from TOML text over the built-in defaults
    pub fn from_toml(environment: &str, toml: &str) -> Result<Self, ConfigError> {
        let config: Self = defaults(environment)?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.check()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    fn check(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Message("jwt.secret must be set".to_string()));
        }
        // Saving a log holds one connection for the batch lock while the
        // stock deduction runs on another.
        if self.database.max_connections < 2 {
            return Err(ConfigError::Message(
                "database.max_connections must be at least 2".to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "database.min_connections cannot exceed database.max_connections".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Pool settings; the caller picks `connect` or `connect_lazy`
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }
}
