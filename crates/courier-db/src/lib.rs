//! Database layer for the Courier messaging backend.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode
//! initialization, and embedded SQL migrations. Every table used by the
//! channel store, message store, and event queue is created through
//! versioned migrations managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process required;
//!   WAL allows concurrent readers with a single writer, which matches
//!   the request-per-task access pattern of the server.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management. The pool handle is the store's shared state.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so migrations ship with the server and cannot drift
//!   from the code that depends on them.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
