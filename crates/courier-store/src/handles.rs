//! Pooled async store handles.
//!
//! rusqlite is synchronous, so every operation checks a connection out of
//! the r2d2 pool inside `tokio::task::spawn_blocking`. The handles are
//! cheap to clone and are constructed once at process start, then passed
//! into the dispatcher and domain service — no ambient global state.

use courier_db::DbPool;
use courier_types::{Channel, Message};
use tokio::task::spawn_blocking;

use crate::channels::{self, ChannelPatch, NewChannel};
use crate::messages::{self, NewMessage};
use crate::StoreError;

/// Handle to the channel collection.
#[derive(Clone)]
pub struct ChannelStore {
    pool: DbPool,
}

impl ChannelStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: NewChannel) -> Result<Channel, StoreError> {
        let pool = self.pool.clone();
        spawn_blocking(move || {
            let conn = pool.get()?;
            channels::insert_channel(&conn, &new)
        })
        .await?
    }

    pub async fn get(&self, channel_id: &str) -> Result<Channel, StoreError> {
        let pool = self.pool.clone();
        let id = channel_id.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            channels::get_channel(&conn, &id)
        })
        .await?
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Channel>, StoreError> {
        let pool = self.pool.clone();
        let name = name.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            channels::get_channel_by_name(&conn, &name)
        })
        .await?
    }

    pub async fn list(&self) -> Result<Vec<Channel>, StoreError> {
        let pool = self.pool.clone();
        spawn_blocking(move || {
            let conn = pool.get()?;
            channels::list_channels(&conn)
        })
        .await?
    }

    pub async fn update(
        &self,
        channel_id: &str,
        patch: ChannelPatch,
    ) -> Result<Channel, StoreError> {
        let pool = self.pool.clone();
        let id = channel_id.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            channels::update_channel(&conn, &id, &patch)
        })
        .await?
    }

    pub async fn delete(&self, channel_id: &str) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let id = channel_id.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            channels::delete_channel(&conn, &id)
        })
        .await?
    }
}

/// Handle to the message collection.
#[derive(Clone)]
pub struct MessageStore {
    pool: DbPool,
}

impl MessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: NewMessage) -> Result<Message, StoreError> {
        let pool = self.pool.clone();
        spawn_blocking(move || {
            let conn = pool.get()?;
            messages::insert_message(&conn, &new)
        })
        .await?
    }

    pub async fn get(&self, message_id: &str) -> Result<Message, StoreError> {
        let pool = self.pool.clone();
        let id = message_id.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            messages::get_message(&conn, &id)
        })
        .await?
    }

    pub async fn update_body(&self, message_id: &str, body: &str) -> Result<Message, StoreError> {
        let pool = self.pool.clone();
        let id = message_id.to_string();
        let body = body.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            messages::update_message_body(&conn, &id, &body)
        })
        .await?
    }

    pub async fn delete(&self, message_id: &str) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let id = message_id.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            messages::delete_message(&conn, &id)
        })
        .await?
    }

    pub async fn delete_all_for_channel(&self, channel_id: &str) -> Result<usize, StoreError> {
        let pool = self.pool.clone();
        let id = channel_id.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            messages::delete_all_for_channel(&conn, &id)
        })
        .await?
    }

    pub async fn list(&self, channel_id: &str, limit: u32) -> Result<Vec<Message>, StoreError> {
        let pool = self.pool.clone();
        let id = channel_id.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            messages::list_messages(&conn, &id, limit)
        })
        .await?
    }
}
