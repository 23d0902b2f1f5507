//! Active-record persistence over SQLite.
//! Entities declare a schema once and get save/fetch/select/delete plus
//! dict and JSON conversions from the [`Model`] trait.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod schema;

pub use config::{Config, ConfigError, ConfigResult};
pub use db::{Database, DatabaseConfig, DbError, DbResult, Session, SessionStats};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{ErrorKind, Filter, Model, ModelError, ModelId, ModelResult, Record, Value};
pub use schema::naming::{pluralize, table_name};
pub use schema::{Column, ColumnType, Constraint, Schema, SchemaError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
