//! Process settings read once at startup.
//!
//! # Responsibility
//! - Load settings from environment variables, optionally seeded by `.env`.
//! - Normalize values so later layers never re-parse them.
//!
//! # Invariants
//! - Loading never panics; malformed values surface as `ConfigError`.
//! - A missing variable falls back to a documented default.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_PROJECT_NAME: &str = "PROJECT_NAME";
pub const ENV_API_VERSION: &str = "API_VERSION";
pub const ENV_LOGMODE: &str = "LOGMODE";
pub const ENV_LOG_DIR: &str = "LOG_DIR";
pub const ENV_DATABASE_PATH: &str = "DATABASE_PATH";

const DEFAULT_PROJECT_NAME: &str = "scaffold";
const DEFAULT_API_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, message: String },
    DotEnv(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
            Self::DotEnv(message) => write!(f, "failed to load .env file: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    InMemory,
    File(PathBuf),
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub project_name: String,
    /// Mount prefix for the versioned API, e.g. `v1`.
    pub api_version: String,
    /// Normalized minimum log level.
    pub log_mode: &'static str,
    /// Optional absolute directory for rolling log files.
    pub log_dir: Option<PathBuf>,
    pub database: DatabaseLocation,
}

impl Settings {
    /// Loads settings from the process environment after reading `.env`
    /// if one exists in the working directory or its parents.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(ConfigError::DotEnv(err.to_string())),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let log_mode = match read(ENV_LOGMODE) {
            Some(level) => normalize_level(&level).map_err(|message| ConfigError::InvalidValue {
                key: ENV_LOGMODE,
                message,
            })?,
            None => default_log_level(),
        };

        let log_dir = match read(ENV_LOG_DIR) {
            Some(dir) if !Path::new(&dir).is_absolute() => {
                return Err(ConfigError::InvalidValue {
                    key: ENV_LOG_DIR,
                    message: format!("must be an absolute path, got `{dir}`"),
                });
            }
            Some(dir) => Some(PathBuf::from(dir)),
            None => None,
        };

        let database = match read(ENV_DATABASE_PATH) {
            Some(path) if path == ":memory:" => DatabaseLocation::InMemory,
            Some(path) => DatabaseLocation::File(PathBuf::from(path)),
            None => DatabaseLocation::InMemory,
        };

        Ok(Self {
            project_name: read(ENV_PROJECT_NAME).unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            api_version: read(ENV_API_VERSION).unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            log_mode,
            log_dir,
            database,
        })
    }

    /// Path prefix under which feature routers are mounted, e.g. `/api/v1`.
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.api_version)
    }
}
