//! SQLite storage access and scoped session management.
//!
//! # Responsibility
//! - Resolve the configured database URI into a file-backed target.
//! - Hand out short-lived sessions, one fresh connection each.
//!
//! # Invariants
//! - No pooling: every session opens and closes its own connection.
//! - A session never outlives the call that opened it; release happens on
//!   every exit path, including early returns and panics.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
mod session;

pub use open::{Database, DatabaseConfig, SessionStats, DEFAULT_BUSY_TIMEOUT};
pub use session::Session;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    InvalidUri(String),
    TransactionState(&'static str),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidUri(message) => write!(f, "invalid database uri: {message}"),
            Self::TransactionState(message) => write!(f, "invalid transaction state: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidUri(_) | Self::TransactionState(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
