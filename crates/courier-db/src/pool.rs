//! SQLite connection pooling.
//!
//! One process-wide r2d2 pool; every connection runs the same pragma
//! setup before it is handed out. WAL keeps readers unblocked while a
//! single writer commits, which matches the request-per-task access
//! pattern of the server.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// The shared SQLite connection pool handle.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Tunables applied to every pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Milliseconds a connection waits on a locked database before
    /// giving up with SQLITE_BUSY.
    pub busy_timeout_ms: u64,

    /// Upper bound on concurrently checked-out connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a pool over `db_path`, applying [`DbRuntimeSettings`] to each
/// new connection.
///
/// `:memory:` is accepted for tests; note that every in-memory
/// connection is a private database, so in-memory pools should be capped
/// at one connection.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the pool cannot open its first
/// connection.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| init_connection(conn, settings));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    tracing::debug!(
        db_path,
        pool_max_size = settings.pool_max_size,
        "database pool ready"
    );
    Ok(pool)
}

/// Pragma setup run once per fresh connection.
///
/// `PRAGMA journal_mode` reports the mode actually in effect, so the
/// result is checked rather than assumed: anything other than `wal` (or
/// `memory`, for in-memory databases) fails connection init.
fn init_connection(conn: &mut Connection, settings: DbRuntimeSettings) -> rusqlite::Result<()> {
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode is {journal_mode}, expected wal")),
        ));
    }

    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {};",
        settings.busy_timeout_ms
    ))
}
