//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Create the database and apply migrations once at process start.
//! - Open one short-lived connection per write request.
//! - Configure connection pragmas required by the pair invariant.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and the configured busy timeout.
//! - `connect` never creates a database; a missing file is a connection error.

use super::migrations::apply_migrations;
use super::DbResult;
use crate::config::DbConfig;
use log::{debug, error, info};
use rusqlite::{Connection, OpenFlags};
use std::time::Instant;

/// Opens (creating if needed) the configured database and applies all
/// pending migrations.
///
/// # Side effects
/// - Creates the database file when absent.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(config: &DbConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start path={}",
        config.path.display()
    );

    let result = open_and_migrate(config);

    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

/// Opens one read-write connection to an existing database.
///
/// No migrations run here; the database must have been bootstrapped by
/// [`open_db`] first.
pub fn connect(config: &DbConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let result = open_existing(config);

    match &result {
        Ok(_) => debug!(
            "event=db_connect module=db status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_connect module=db status=error duration_ms={} error_code=db_connect_failed error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn open_and_migrate(config: &DbConfig) -> DbResult<Connection> {
    let mut conn = Connection::open(&config.path)?;
    configure_connection(&conn, config)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn open_existing(config: &DbConfig) -> DbResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(&config.path, flags)?;
    configure_connection(&conn, config)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection, config: &DbConfig) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(config.busy_timeout)?;
    Ok(())
}
