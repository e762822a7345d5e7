//! Application configuration.
//!
//! Values come from a YAML file, then `APP_SECTION_FIELD` environment
//! variables override individual fields. Every field has a default, so an
//! empty or absent file is valid apart from the JWT secret.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use bazaar_core::db::DbSettings;
use serde::Deserialize;
use thiserror::Error;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "APP_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidOverride { key: String, value: String },

    #[error("jwt.secret_key must not be empty")]
    MissingSecret,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub user: String,
    pub password: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub sslmode: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            user: "postgres".into(),
            password: "postgres".into(),
            name: "bazaar".into(),
            host: "localhost".into(),
            port: 5432,
            sslmode: "disable".into(),
            max_connections: 10,
            min_connections: 1,
            max_lifetime_secs: 30 * 60,
            idle_timeout_secs: 5 * 60,
        }
    }
}

impl DbConfig {
    pub fn settings(&self) -> DbSettings {
        DbSettings {
            user: self.user.clone(),
            password: self.password.clone(),
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            sslmode: self.sslmode.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            max_lifetime: Duration::from_secs(self.max_lifetime_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret_key: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_days: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            access_ttl_secs: 15 * 60,
            refresh_ttl_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { bcrypt_cost: 12 }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logger: LoggerConfig,
    pub server: ServerConfig,
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
}

fn set_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut String) {
    if let Some(value) = lookup(key) {
        *target = value;
    }
}

fn set_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(value) = lookup(key) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidOverride {
                key: key.to_string(),
                value,
            })?;
    }
    Ok(())
}

impl AppConfig {
    /// Load `path`, apply process environment overrides, and check the
    /// result. A missing file falls back to defaults unless `required`.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_yaml(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Self::default(),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.check()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overwrite fields from `lookup`, keyed `APP_SECTION_FIELD`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let key = |name: &str| format!("{ENV_PREFIX}{name}");

        set_string(&lookup, &key("LOGGER_LEVEL"), &mut self.logger.level);

        set_string(&lookup, &key("SERVER_HOST"), &mut self.server.host);
        set_parsed(&lookup, &key("SERVER_PORT"), &mut self.server.port)?;

        set_string(&lookup, &key("DB_USER"), &mut self.db.user);
        set_string(&lookup, &key("DB_PASSWORD"), &mut self.db.password);
        set_string(&lookup, &key("DB_NAME"), &mut self.db.name);
        set_string(&lookup, &key("DB_HOST"), &mut self.db.host);
        set_parsed(&lookup, &key("DB_PORT"), &mut self.db.port)?;
        set_string(&lookup, &key("DB_SSLMODE"), &mut self.db.sslmode);
        set_parsed(&lookup, &key("DB_MAX_CONNECTIONS"), &mut self.db.max_connections)?;
        set_parsed(&lookup, &key("DB_MIN_CONNECTIONS"), &mut self.db.min_connections)?;
        set_parsed(&lookup, &key("DB_MAX_LIFETIME_SECS"), &mut self.db.max_lifetime_secs)?;
        set_parsed(&lookup, &key("DB_IDLE_TIMEOUT_SECS"), &mut self.db.idle_timeout_secs)?;

        set_string(&lookup, &key("JWT_SECRET_KEY"), &mut self.jwt.secret_key);
        set_parsed(&lookup, &key("JWT_ACCESS_TTL_SECS"), &mut self.jwt.access_ttl_secs)?;
        set_parsed(&lookup, &key("JWT_REFRESH_TTL_DAYS"), &mut self.jwt.refresh_ttl_days)?;

        set_parsed(&lookup, &key("AUTH_BCRYPT_COST"), &mut self.auth.bcrypt_cost)?;
        Ok(())
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.jwt.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(())
    }
}
