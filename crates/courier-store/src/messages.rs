//! Message collection: insert, get, update, delete, cascade delete, list.

use courier_types::Message;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{now_rfc3339, StoreError};

/// Parameters for inserting a new message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub channel_id: String,
    pub body: String,
    pub creator: String,
}

/// Inserts a new message, assigning a fresh opaque identifier and the
/// creation timestamp. Returns the stored entity.
///
/// The foreign key on `channel_id` rejects messages for channels that do
/// not exist; the domain service checks existence first to turn that
/// case into a not-found instead.
pub fn insert_message(conn: &Connection, new: &NewMessage) -> Result<Message, StoreError> {
    let message = Message {
        id: Uuid::new_v4().to_string(),
        channel_id: new.channel_id.clone(),
        body: new.body.clone(),
        creator: new.creator.clone(),
        created_at: now_rfc3339(),
        edited_at: String::new(),
    };

    conn.execute(
        "INSERT INTO messages (message_id, channel_id, body, creator, created_at, edited_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            message.id,
            message.channel_id,
            message.body,
            message.creator,
            message.created_at,
            message.edited_at,
        ],
    )?;

    Ok(message)
}

/// Retrieves a message by its public identifier.
pub fn get_message(conn: &Connection, message_id: &str) -> Result<Message, StoreError> {
    conn.query_row(
        "SELECT message_id, channel_id, body, creator, created_at, edited_at
         FROM messages WHERE message_id = ?1",
        [message_id],
        map_row_to_message,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(message_id.to_string()))
}

/// Replaces a message's body and sets `edited_at`. Returns the updated
/// entity, or `NotFound` if absent.
pub fn update_message_body(
    conn: &Connection,
    message_id: &str,
    body: &str,
) -> Result<Message, StoreError> {
    let count = conn.execute(
        "UPDATE messages SET body = ?1, edited_at = ?2 WHERE message_id = ?3",
        params![body, now_rfc3339(), message_id],
    )?;
    if count == 0 {
        return Err(StoreError::NotFound(message_id.to_string()));
    }

    get_message(conn, message_id)
}

/// Deletes a message by identifier. Idempotent.
pub fn delete_message(conn: &Connection, message_id: &str) -> Result<(), StoreError> {
    conn.execute("DELETE FROM messages WHERE message_id = ?1", [message_id])?;
    Ok(())
}

/// Removes every message in the given channel. Returns the removed count.
pub fn delete_all_for_channel(conn: &Connection, channel_id: &str) -> Result<usize, StoreError> {
    let count = conn.execute("DELETE FROM messages WHERE channel_id = ?1", [channel_id])?;
    tracing::debug!(channel_id, count, "removed channel messages");
    Ok(count)
}

/// Lists the most recent messages in a channel, newest first.
///
/// Ties on `created_at` fall back to insertion order so the ordering is
/// strict even within one clock tick.
pub fn list_messages(
    conn: &Connection,
    channel_id: &str,
    limit: u32,
) -> Result<Vec<Message>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT message_id, channel_id, body, creator, created_at, edited_at
         FROM messages
         WHERE channel_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![channel_id, limit], map_row_to_message)?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

fn map_row_to_message(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        body: row.get(2)?,
        creator: row.get(3)?,
        created_at: row.get(4)?,
        edited_at: row.get(5)?,
    })
}
