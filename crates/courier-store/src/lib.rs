//! Persistence for channels and messages.
//!
//! Two independent entity collections backed by SQLite. The sync
//! functions in [`channels`] and [`messages`] operate on a single
//! `rusqlite::Connection` and are each one SQL statement — no caller can
//! observe a partially written entity. The pooled handles
//! [`ChannelStore`] and [`MessageStore`] wrap those functions in
//! `tokio::task::spawn_blocking` for use from async request handlers.
//!
//! The stores are the single writer of entity state; the domain service
//! never mutates rows directly.

pub mod channels;
mod handles;
pub mod messages;

use thiserror::Error;

pub use channels::{ChannelPatch, NewChannel};
pub use handles::{ChannelStore, MessageStore};
pub use messages::NewMessage;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// True when the underlying failure is a SQLite constraint violation,
    /// such as a duplicate value on a UNIQUE column. Callers racing past
    /// an existence pre-check use this to report a conflict instead of an
    /// internal error.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ffi::ErrorCode::ConstraintViolation
        )
    }
}

/// Returns the current UTC time as an RFC 3339 string.
///
/// All entity timestamps come from the server clock via this helper so
/// newest-first ordering can compare strings lexicographically.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
