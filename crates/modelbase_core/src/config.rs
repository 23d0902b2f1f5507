//! Process configuration read from `APP_*` environment variables.
//!
//! # Responsibility
//! - Resolve database, logging and testing settings with their defaults.
//! - Load a `.env` file at most once per process before the first lookup.
//!
//! # Invariants
//! - Parsing goes through an injectable lookup; tests never touch the
//!   process environment.
//! - A rejected value names its key.

use crate::db::{Database, DatabaseConfig, DbResult};
use crate::logging::default_log_level;
use once_cell::sync::Lazy;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DATABASE_URI_KEY: &str = "APP_DATABASE_URI";
pub const DB_PATH_KEY: &str = "APP_DB";
pub const LOG_LEVEL_KEY: &str = "APP_LOG_LEVEL";
pub const LOG_DIRECTORY_KEY: &str = "APP_LOG_DIRECTORY";
pub const TESTING_KEY: &str = "APP_TESTING";
pub const BUSY_TIMEOUT_KEY: &str = "APP_DB_BUSY_TIMEOUT_MS";

const DEFAULT_DB_PATH: &str = "app.db";
const DEFAULT_LOG_DIRECTORY: &str = "/var/log/app";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
});

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Empty { key: &'static str },
    InvalidBool { key: &'static str, value: String },
    InvalidInteger { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty { key } => write!(f, "{key} is set but empty"),
            Self::InvalidBool { key, value } => {
                write!(f, "{key} expects a boolean, got `{value}`")
            }
            Self::InvalidInteger { key, value } => {
                write!(f, "{key} expects a non-negative integer, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_uri: String,
    pub log_level: String,
    pub log_directory: String,
    pub testing: bool,
    pub busy_timeout: Duration,
}

impl Config {
    /// Reads the process environment, loading `.env` on first use.
    pub fn from_env() -> ConfigResult<Self> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    ///
    /// # Errors
    /// - [`ConfigError::Empty`] for a present but blank URI or path.
    /// - [`ConfigError::InvalidBool`] / [`ConfigError::InvalidInteger`] for
    ///   unparseable flags and timeouts.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_uri = match lookup(DATABASE_URI_KEY) {
            Some(uri) => non_empty(DATABASE_URI_KEY, uri)?,
            None => {
                let path = match lookup(DB_PATH_KEY) {
                    Some(path) => non_empty(DB_PATH_KEY, path)?,
                    None => DEFAULT_DB_PATH.to_string(),
                };
                sqlite_uri(&path)
            }
        };

        let log_level = lookup(LOG_LEVEL_KEY)
            .map(|level| level.trim().to_string())
            .filter(|level| !level.is_empty())
            .unwrap_or_else(|| default_log_level().to_string());
        let log_directory = lookup(LOG_DIRECTORY_KEY)
            .map(|dir| dir.trim().to_string())
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_DIRECTORY.to_string());

        let testing = match lookup(TESTING_KEY) {
            Some(value) => parse_bool(TESTING_KEY, &value)?,
            None => false,
        };
        let busy_timeout_ms = match lookup(BUSY_TIMEOUT_KEY) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidInteger {
                    key: BUSY_TIMEOUT_KEY,
                    value,
                })?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        Ok(Self {
            database_uri,
            log_level,
            log_directory,
            testing,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
        })
    }

    /// Session provider for the configured database.
    pub fn database(&self) -> DbResult<Database> {
        let config = DatabaseConfig::from_uri(&self.database_uri)?
            .with_busy_timeout(self.busy_timeout);
        Ok(Database::new(config))
    }
}

fn non_empty(key: &'static str, value: String) -> ConfigResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty { key });
    }
    Ok(trimmed.to_string())
}

/// `sqlite:///abs/path` for absolute paths, `sqlite://rel/path` otherwise.
fn sqlite_uri(path: &str) -> String {
    format!("sqlite://{path}")
}

fn parse_bool(key: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_string(),
        }),
    }
}
