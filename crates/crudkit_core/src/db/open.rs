//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply connection pragmas requested by the connection string.
//!
//! # Invariants
//! - Every open attempt emits a `db_open` start event and exactly one
//!   ok/error event with its duration.

use super::DbResult;
use crate::config::{ConnectionConfig, ConnectionTarget};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

/// Opens a connection described by a connection string.
///
/// See [`ConnectionConfig::parse`] for accepted forms.
pub fn open_db(connection_string: &str) -> DbResult<Connection> {
    let config = ConnectionConfig::parse(connection_string)?;
    open_db_with(&config)
}

/// Opens a SQLite database file with default connection options.
pub fn open_db_path(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with(&ConnectionConfig::file(path.as_ref()))
}

/// Opens an in-memory SQLite database with default connection options.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db_with(&ConnectionConfig::memory())
}

/// Opens and configures a connection from parsed options.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_with(config: &ConnectionConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = match config.target {
        ConnectionTarget::Memory => "memory",
        ConnectionTarget::File(_) => "file",
    };
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match &config.target {
        ConnectionTarget::Memory => Connection::open_in_memory(),
        ConnectionTarget::File(path) => Connection::open(path),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={} foreign_keys={}",
                mode,
                started_at.elapsed().as_millis(),
                config.foreign_keys
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_configure_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(conn: &Connection, config: &ConnectionConfig) -> DbResult<()> {
    let pragma = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {pragma};"))?;
    conn.busy_timeout(config.busy_timeout)?;
    Ok(())
}
