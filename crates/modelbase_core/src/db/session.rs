//! Scoped session guard around one SQLite connection.
//!
//! # Invariants
//! - A session owns exactly one connection and never hands it out by value.
//! - Dropping a session rolls back any transaction still open, then closes
//!   the connection.

use super::{DbError, DbResult};
use log::{debug, warn};
use rusqlite::Connection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub(crate) opened: AtomicU64,
    pub(crate) closed: AtomicU64,
}

/// Short-lived handle bound to one freshly opened connection.
pub struct Session {
    conn: Connection,
    id: Uuid,
    in_transaction: bool,
    opened_at: Instant,
    counters: Arc<SessionCounters>,
}

impl Session {
    pub(crate) fn new(conn: Connection, counters: Arc<SessionCounters>) -> Self {
        counters.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            conn,
            id: Uuid::new_v4(),
            in_transaction: false,
            opened_at: Instant::now(),
            counters,
        }
    }

    /// Correlation id carried by every log line of this session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Starts a write transaction, taking the database write lock up front.
    pub fn begin(&mut self) -> DbResult<()> {
        if self.in_transaction {
            return Err(DbError::TransactionState("transaction already open"));
        }
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        self.in_transaction = true;
        debug!("event=tx_begin module=db status=ok session={}", self.id);
        Ok(())
    }

    /// Commits the open transaction.
    ///
    /// On failure the transaction stays open; the caller is expected to
    /// `rollback()` before giving up.
    pub fn commit(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            return Err(DbError::TransactionState("no open transaction to commit"));
        }
        self.conn.execute_batch("COMMIT;")?;
        self.in_transaction = false;
        debug!("event=tx_commit module=db status=ok session={}", self.id);
        Ok(())
    }

    /// Rolls back the open transaction. No-op when nothing is open.
    pub fn rollback(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        // SQLite may already have rolled back on its own after some errors.
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK;")?;
        debug!("event=tx_rollback module=db status=ok session={}", self.id);
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let pending = self.in_transaction;
        if let Err(err) = self.rollback() {
            warn!(
                "event=session_close module=db status=error session={} error_code=rollback_failed error={}",
                self.id, err
            );
        }
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        debug!(
            "event=session_close module=db status=ok session={} rolled_back={} duration_ms={}",
            self.id,
            pending,
            self.opened_at.elapsed().as_millis()
        );
    }
}
