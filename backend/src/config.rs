//! Application configuration.
//!
//! Loaded once at startup from `visit-tracker.toml` plus environment
//! overrides, then passed by value to whatever needs it. Nothing reads
//! configuration from global state after startup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::db::RepositoryConfig;
use crate::services::lifecycle::DEFAULT_GRACE_PERIOD_MINUTES;
use crate::services::LifecycleSettings;

pub const CONFIG_FILE_NAME: &str = "visit-tracker.toml";
pub const CONFIG_PATH_ENV: &str = "VISIT_TRACKER_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(flatten)]
    pub storage: RepositoryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret. Required.
    #[serde(default)]
    pub jwt_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_grace_period_minutes")]
    pub grace_period_minutes: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_period_minutes: default_grace_period_minutes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_grace_period_minutes() -> i64 {
    DEFAULT_GRACE_PERIOD_MINUTES
}

fn override_parsed<T: FromStr>(target: &mut T, key: &str) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var(key) {
        *target = raw
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{} has an invalid value: {:?}", key, raw)))?;
    }
    Ok(())
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `$VISIT_TRACKER_CONFIG` if set, else the first of
    /// `./visit-tracker.toml` and `backend/visit-tracker.toml` that exists.
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        [
            PathBuf::from(CONFIG_FILE_NAME),
            Path::new("backend").join(CONFIG_FILE_NAME),
        ]
        .into_iter()
        .find(|p| p.exists())
    }

    /// File (when found) plus environment overrides, validated.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::locate() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        override_parsed(&mut self.server.port, "PORT")?;
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        override_parsed(
            &mut self.lifecycle.grace_period_minutes,
            "GRACE_PERIOD_MINUTES",
        )?;
        self.storage.apply_env_overrides();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret (or JWT_SECRET) must be set".to_string(),
            ));
        }
        if self.lifecycle.grace_period_minutes < 0 {
            return Err(ConfigError::Invalid(
                "lifecycle.grace_period_minutes must not be negative".to_string(),
            ));
        }
        self.storage
            .repository_type()
            .map_err(ConfigError::Invalid)?;
        Ok(())
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings::with_grace_minutes(self.lifecycle.grace_period_minutes)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
