use std::env;
use std::time::Duration;

use auth::PasswordHasher;
use auth::TokenSettings;
use config::builder::DefaultState;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

/// Signing secret used when none is configured outside production.
const DEVELOPMENT_JWT_SECRET: &str = "development-only-secret-do-not-deploy";

/// Only variables starting with `IDENTITY_` override configuration.
const ENV_PREFIX: &str = "IDENTITY";

/// Deployment mode, selected with the `RUN_MODE` environment variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    Production,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub run_mode: RunMode,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub password: PasswordConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Unset means the in-memory store (development only)
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: Option<String>,
    pub issuer: String,
    pub access_token_ttl_seconds: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub refresh_token_ttl_days: i64,
    pub store_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (IDENTITY_DATABASE__URL, IDENTITY_JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{run_mode}.toml)
    /// 3. Default config file (config/default.toml)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = Self::builder(&run_mode)?
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: IDENTITY_DATABASE__URL=postgres://... overrides database.url
            .add_source(Self::environment())
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    fn builder(
        run_mode: &str,
    ) -> Result<config::builder::ConfigBuilder<DefaultState>, ConfigError> {
        ConfigBuilder::builder()
            .set_default("run_mode", run_mode)?
            .set_default("database.max_connections", 5)?
            .set_default("server.http_port", 8080)?
            .set_default("server.request_timeout_secs", 60)?
            .set_default("jwt.issuer", "identity-service")?
            .set_default("jwt.access_token_ttl_seconds", 900)?
            .set_default("session.refresh_token_ttl_days", 30)?
            .set_default("session.store_timeout_ms", 3000)?
            // Argon2id defaults
            .set_default("password.memory_kib", 19456)?
            .set_default("password.iterations", 2)?
            .set_default("password.parallelism", 1)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.access_token_ttl_seconds <= 0 {
            return Err(ConfigError::Message(
                "jwt.access_token_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.session.refresh_token_ttl_days <= 0 {
            return Err(ConfigError::Message(
                "session.refresh_token_ttl_days must be positive".to_string(),
            ));
        }
        if self.run_mode == RunMode::Production {
            if self.database.url.is_none() {
                return Err(ConfigError::Message(
                    "database.url is required in production".to_string(),
                ));
            }
            if self.jwt.secret.as_deref().unwrap_or_default().is_empty() {
                return Err(ConfigError::Message(
                    "jwt.secret is required in production".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Secret for signing access tokens.
    ///
    /// Outside production an unset secret falls back to a fixed development
    /// value, with a warning.
    pub fn signing_secret(&self) -> Result<Vec<u8>, ConfigError> {
        match self.jwt.secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret.as_bytes().to_vec()),
            _ if self.run_mode == RunMode::Production => Err(ConfigError::Message(
                "jwt.secret is required in production".to_string(),
            )),
            _ => {
                tracing::warn!("jwt.secret is not set; using the development signing secret");
                Ok(DEVELOPMENT_JWT_SECRET.as_bytes().to_vec())
            }
        }
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            issuer: self.jwt.issuer.clone(),
            access_token_ttl: chrono::Duration::seconds(self.jwt.access_token_ttl_seconds),
            refresh_token_ttl: chrono::Duration::days(self.session.refresh_token_ttl_days),
        }
    }

    pub fn password_hasher(&self) -> Result<PasswordHasher, ConfigError> {
        PasswordHasher::with_cost(
            self.password.memory_kib,
            self.password.iterations,
            self.password.parallelism,
        )
        .map_err(|e| ConfigError::Message(e.to_string()))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.session.store_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
