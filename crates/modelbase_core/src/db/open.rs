//! Database target resolution and per-call connection bootstrap.
//!
//! # Responsibility
//! - Parse the configured URI into a file-backed SQLite target.
//! - Open and configure one connection per session.
//!
//! # Invariants
//! - Returned sessions have `foreign_keys=ON` and the configured busy timeout.
//! - In-memory targets are rejected: a fresh connection per call would see a
//!   fresh, empty database every time.

use super::session::{Session, SessionCounters};
use super::{DbError, DbResult};
use log::{debug, error};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SQLITE_SCHEME: &str = "sqlite://";

/// Connection settings shared by every session of a [`Database`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Accepts `sqlite:///abs/path`, `sqlite://relative/path` or a bare path.
    pub fn from_uri(uri: &str) -> DbResult<Self> {
        parse_sqlite_uri(uri).map(Self::new)
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Snapshot of session bookkeeping for one [`Database`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub opened: u64,
    pub closed: u64,
}

impl SessionStats {
    pub fn active(&self) -> u64 {
        self.opened.saturating_sub(self.closed)
    }
}

/// Session provider for one configured storage backend.
///
/// Cloning is cheap; clones share the same counters.
#[derive(Debug, Clone)]
pub struct Database {
    config: Arc<DatabaseConfig>,
    counters: Arc<SessionCounters>,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config: Arc::new(config),
            counters: Arc::new(SessionCounters::default()),
        }
    }

    pub fn from_uri(uri: &str) -> DbResult<Self> {
        DatabaseConfig::from_uri(uri).map(Self::new)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn session_stats(&self) -> SessionStats {
        SessionStats {
            opened: self.counters.opened.load(Ordering::SeqCst),
            closed: self.counters.closed.load(Ordering::SeqCst),
        }
    }

    /// Opens a new connection and wraps it in a [`Session`] guard.
    ///
    /// # Side effects
    /// - Opens exactly one connection; the guard closes it on drop.
    /// - Emits `session_open` logging events with duration and status.
    pub fn open_session(&self) -> DbResult<Session> {
        let started_at = Instant::now();

        let conn = match Connection::open(&self.config.path) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=session_open module=db status=error path={} duration_ms={} error_code=db_open_failed error={}",
                    self.config.path.display(),
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        if let Err(err) = configure_connection(&conn, self.config.busy_timeout) {
            error!(
                "event=session_open module=db status=error path={} duration_ms={} error_code=db_bootstrap_failed error={}",
                self.config.path.display(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }

        let session = Session::new(conn, Arc::clone(&self.counters));
        debug!(
            "event=session_open module=db status=ok session={} duration_ms={}",
            session.id(),
            started_at.elapsed().as_millis()
        );
        Ok(session)
    }

    /// Runs `body` inside a fresh session and releases it afterwards,
    /// whatever `body` returns.
    pub fn with_session<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut session = self.open_session()?;
        body(&mut session)
    }
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

fn parse_sqlite_uri(uri: &str) -> DbResult<PathBuf> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(DbError::InvalidUri("uri cannot be empty".to_string()));
    }

    let path = if let Some(rest) = trimmed.strip_prefix(SQLITE_SCHEME) {
        rest
    } else if trimmed.contains("://") {
        return Err(DbError::InvalidUri(format!(
            "unsupported scheme in `{trimmed}`; expected sqlite://"
        )));
    } else {
        trimmed
    };

    if path.is_empty() {
        return Err(DbError::InvalidUri(format!("`{trimmed}` names no database file")));
    }
    if is_in_memory(path) {
        return Err(DbError::InvalidUri(format!(
            "`{trimmed}` is in-memory; sessions open a fresh connection per call"
        )));
    }

    Ok(PathBuf::from(path))
}

fn is_in_memory(path: &str) -> bool {
    path == ":memory:" || path.starts_with("file::memory:") || path.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::{parse_sqlite_uri, DatabaseConfig, DEFAULT_BUSY_TIMEOUT};
    use crate::db::DbError;
    use std::path::PathBuf;

    #[test]
    fn parses_absolute_and_relative_sqlite_uris() {
        assert_eq!(
            parse_sqlite_uri("sqlite:///var/lib/app/app.db").unwrap(),
            PathBuf::from("/var/lib/app/app.db")
        );
        assert_eq!(
            parse_sqlite_uri("sqlite://data/app.db").unwrap(),
            PathBuf::from("data/app.db")
        );
        assert_eq!(
            parse_sqlite_uri(" /tmp/app.db ").unwrap(),
            PathBuf::from("/tmp/app.db")
        );
    }

    #[test]
    fn rejects_memory_empty_and_foreign_uris() {
        for uri in ["", "sqlite://", "sqlite://:memory:", ":memory:", "postgres://db/app"] {
            let err = parse_sqlite_uri(uri).unwrap_err();
            assert!(matches!(err, DbError::InvalidUri(_)), "uri `{uri}` should be rejected");
        }
    }

    #[test]
    fn config_defaults_busy_timeout() {
        let config = DatabaseConfig::from_uri("sqlite:///tmp/app.db").unwrap();
        assert_eq!(config.busy_timeout, DEFAULT_BUSY_TIMEOUT);
    }
}
