//! Channel collection: insert, get, get-by-name, update, delete, list.

use courier_types::Channel;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{now_rfc3339, StoreError};

/// Parameters for inserting a new channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChannel {
    pub name: String,
    pub description: String,
    pub creator: String,
}

/// Partial update for a channel. `None` fields retain their prior value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ChannelPatch {
    /// True when no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Inserts a new channel, assigning a fresh opaque identifier and the
/// creation timestamp. Returns the stored entity.
///
/// A duplicate name violates the UNIQUE constraint on `channels.name`
/// and surfaces as `StoreError::Database`; callers translate that into
/// a conflict.
pub fn insert_channel(conn: &Connection, new: &NewChannel) -> Result<Channel, StoreError> {
    let channel = Channel {
        id: Uuid::new_v4().to_string(),
        name: new.name.clone(),
        description: new.description.clone(),
        creator: new.creator.clone(),
        created_at: now_rfc3339(),
        edited_at: String::new(),
    };

    conn.execute(
        "INSERT INTO channels (channel_id, name, description, creator, created_at, edited_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            channel.id,
            channel.name,
            channel.description,
            channel.creator,
            channel.created_at,
            channel.edited_at,
        ],
    )?;

    Ok(channel)
}

/// Retrieves a channel by its public identifier.
pub fn get_channel(conn: &Connection, channel_id: &str) -> Result<Channel, StoreError> {
    conn.query_row(
        "SELECT channel_id, name, description, creator, created_at, edited_at
         FROM channels WHERE channel_id = ?1",
        [channel_id],
        map_row_to_channel,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(channel_id.to_string()))
}

/// Looks up a channel by name.
///
/// Absence is a sentinel (`None`), not an error — this is the uniqueness
/// pre-check used by the create path.
pub fn get_channel_by_name(conn: &Connection, name: &str) -> Result<Option<Channel>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT channel_id, name, description, creator, created_at, edited_at
             FROM channels WHERE name = ?1",
            [name],
            map_row_to_channel,
        )
        .optional()?)
}

/// Lists all channels, ordered by name.
pub fn list_channels(conn: &Connection) -> Result<Vec<Channel>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT channel_id, name, description, creator, created_at, edited_at
         FROM channels ORDER BY name ASC",
    )?;

    let rows = stmt.query_map([], map_row_to_channel)?;
    let mut channels = Vec::new();
    for row in rows {
        channels.push(row?);
    }
    Ok(channels)
}

/// Updates a channel using a single atomic UPDATE statement.
///
/// Only fields that are `Some` in `patch` are modified; `None` fields
/// are left untouched. `edited_at` is set whenever at least one field is
/// supplied. Returns the updated entity, or `NotFound` if absent.
pub fn update_channel(
    conn: &Connection,
    channel_id: &str,
    patch: &ChannelPatch,
) -> Result<Channel, StoreError> {
    if patch.is_empty() {
        // Nothing to merge; still verify existence.
        return get_channel(conn, channel_id);
    }

    let mut set_parts: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1usize;

    if let Some(name) = &patch.name {
        set_parts.push(format!("name = ?{}", idx));
        values.push(Box::new(name.clone()));
        idx += 1;
    }
    if let Some(description) = &patch.description {
        set_parts.push(format!("description = ?{}", idx));
        values.push(Box::new(description.clone()));
        idx += 1;
    }

    set_parts.push(format!("edited_at = ?{}", idx));
    values.push(Box::new(now_rfc3339()));
    idx += 1;

    let sql = format!(
        "UPDATE channels SET {} WHERE channel_id = ?{}",
        set_parts.join(", "),
        idx
    );
    values.push(Box::new(channel_id.to_string()));

    let params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let count = conn.execute(&sql, params.as_slice())?;
    if count == 0 {
        return Err(StoreError::NotFound(channel_id.to_string()));
    }

    get_channel(conn, channel_id)
}

/// Deletes a channel by identifier. Idempotent: deleting a non-existent
/// identifier is not an error.
pub fn delete_channel(conn: &Connection, channel_id: &str) -> Result<(), StoreError> {
    conn.execute("DELETE FROM channels WHERE channel_id = ?1", [channel_id])?;
    Ok(())
}

fn map_row_to_channel(row: &Row) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        creator: row.get(3)?,
        created_at: row.get(4)?,
        edited_at: row.get(5)?,
    })
}
