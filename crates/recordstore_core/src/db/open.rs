//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file-backed or ephemeral SQLite connections.
//! - Configure connection pragmas required by store behavior.
//! - Trigger internal migrations before returning a primary connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout.
//! - Store connections run in WAL mode so background readers never block on
//!   a primary writer. Ephemeral stores get the same isolation through a
//!   scratch file in a private temporary directory.
//! - Primary connections have migrations fully applied; worker connections
//!   assume the primary already did it.

use super::migrations::apply_migrations;
use crate::error::StoreResult;
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const EPHEMERAL_FILE_NAME: &str = "store.sqlite";

/// Where a store's database lives.
#[derive(Debug, Clone)]
pub enum StoreLocation {
    /// Durable database file.
    File(PathBuf),
    /// Scratch database in a temporary directory; the directory is removed
    /// once the last clone of this location is dropped.
    Ephemeral(Arc<TempDir>),
}

impl StoreLocation {
    /// Creates a fresh ephemeral location under the system temp directory.
    pub fn ephemeral() -> StoreResult<Self> {
        let dir = tempfile::Builder::new().prefix("recordstore-").tempdir()?;
        Ok(Self::Ephemeral(Arc::new(dir)))
    }

    /// Path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Ephemeral(dir) => dir.path().join(EPHEMERAL_FILE_NAME),
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Ephemeral(_) => "ephemeral",
        }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        Connection::open(self.db_path())
    }
}

impl PartialEq for StoreLocation {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::File(left), Self::File(right)) => left == right,
            (Self::Ephemeral(left), Self::Ephemeral(right)) => left.path() == right.path(),
            _ => false,
        }
    }
}

impl Eq for StoreLocation {}

/// Opens the primary connection for `location` and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(location: &StoreLocation, busy_timeout: Duration) -> StoreResult<Connection> {
    open_with(location, "primary", |conn| {
        configure_connection(conn, location, busy_timeout)?;
        apply_migrations(conn)
    })
}

/// Opens a private, unnamed in-memory database with migrations applied.
///
/// Intended for tests and throwaway stores; it cannot back background contexts.
pub fn open_db_in_memory() -> StoreResult<Connection> {
    let started_at = Instant::now();
    let mut conn = Connection::open_in_memory()?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    apply_migrations(&mut conn)?;
    info!(
        "event=db_open module=db status=ok mode=private_memory role=primary duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

/// Opens an additional connection for a background context.
pub(crate) fn open_worker_db(
    location: &StoreLocation,
    busy_timeout: Duration,
) -> StoreResult<Connection> {
    open_with(location, "background", |conn| {
        configure_connection(conn, location, busy_timeout)
    })
}

fn open_with(
    location: &StoreLocation,
    role: &str,
    bootstrap: impl FnOnce(&mut Connection) -> StoreResult<()>,
) -> StoreResult<Connection> {
    let started_at = Instant::now();
    let mode = location.mode();
    info!("event=db_open module=db status=start mode={mode} role={role}");

    let mut conn = match location.connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} role={role} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} role={role} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} role={role} duration_ms={} error_code={} error={}",
                started_at.elapsed().as_millis(),
                err.code(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(
    conn: &Connection,
    location: &StoreLocation,
    busy_timeout: Duration,
) -> StoreResult<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    let journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if !journal_mode.eq_ignore_ascii_case("wal") {
        warn!(
            "event=db_journal_mode module=db status=degraded mode={} requested=wal active={}",
            location.mode(),
            journal_mode
        );
    }
    Ok(())
}
