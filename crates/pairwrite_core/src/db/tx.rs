//! Transaction guard over a single connection.
//!
//! # Responsibility
//! - Start transactions through rusqlite with a configured
//!   `TransactionBehavior`.
//! - Issue `COMMIT` and `ROLLBACK` explicitly so each stage can report its
//!   own failure.
//! - Roll back on drop when the scope ends without commit or rollback.
//!
//! # Invariants
//! - A scope is active from a successful `begin` until `commit` or
//!   `rollback` succeeds.
//! - A failed `COMMIT` leaves the scope active; callers roll back.

use log::warn;
use rusqlite::{Connection, DropBehavior, Transaction, TransactionBehavior};

/// Parses a `deferred|immediate|exclusive` setting, ignoring case.
pub fn parse_tx_behavior(value: &str) -> Option<TransactionBehavior> {
    match value.trim().to_ascii_lowercase().as_str() {
        "deferred" => Some(TransactionBehavior::Deferred),
        "immediate" => Some(TransactionBehavior::Immediate),
        "exclusive" => Some(TransactionBehavior::Exclusive),
        _ => None,
    }
}

/// Lowercase name used in logs.
pub fn tx_behavior_name(behavior: TransactionBehavior) -> &'static str {
    match behavior {
        TransactionBehavior::Deferred => "deferred",
        TransactionBehavior::Immediate => "immediate",
        TransactionBehavior::Exclusive => "exclusive",
        _ => "other",
    }
}

/// Explicit end of an open transaction.
pub trait TxEnd {
    fn commit(&mut self) -> rusqlite::Result<()>;
    fn rollback(&mut self) -> rusqlite::Result<()>;
}

/// Scoped transaction borrowed from one connection.
pub struct TxScope<'conn> {
    tx: Transaction<'conn>,
    active: bool,
}

impl<'conn> TxScope<'conn> {
    /// Starts a transaction with the given lock behavior.
    pub fn begin(
        conn: &'conn Connection,
        behavior: TransactionBehavior,
    ) -> rusqlite::Result<Self> {
        let mut tx = Transaction::new_unchecked(conn, behavior)?;
        // COMMIT and ROLLBACK are issued through `TxEnd`.
        tx.set_drop_behavior(DropBehavior::Ignore);
        Ok(Self { tx, active: true })
    }

    /// Connection to run statements on inside this transaction.
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl TxEnd for TxScope<'_> {
    /// Commits the transaction.
    ///
    /// On error the transaction may still be open (for example a deferred
    /// foreign key violation); the scope stays active.
    fn commit(&mut self) -> rusqlite::Result<()> {
        self.tx.execute_batch("COMMIT;")?;
        self.active = false;
        Ok(())
    }

    /// Rolls the transaction back.
    ///
    /// A no-op when SQLite already ended the transaction on its own.
    fn rollback(&mut self) -> rusqlite::Result<()> {
        if self.tx.is_autocommit() {
            self.active = false;
            return Ok(());
        }
        self.tx.execute_batch("ROLLBACK;")?;
        self.active = false;
        Ok(())
    }
}

impl Drop for TxScope<'_> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(err) = self.rollback() {
            warn!(
                "event=tx_drop_rollback module=db status=error error={}",
                err
            );
        }
    }
}
