//! The chat domain service.
//!
//! All channel and message rules live here: required-field validation,
//! duplicate-name rejection, and creator-only mutation of existing
//! entities. Handlers stay thin — they parse the request, call one
//! method on [`ChatService`], and serialize the result.
//!
//! Every successful mutation publishes exactly one event on the durable
//! queue after the store commit. The publish happens last, so a failed
//! publish leaves the entity state committed and surfaces as a 500.

use courier_events::EventQueue;
use courier_store::{ChannelPatch, ChannelStore, MessageStore, NewChannel, NewMessage, StoreError};
use courier_types::{Channel, Event, Message};

use crate::error::ApiError;

/// Maximum number of messages returned for a channel history read.
pub const MESSAGE_PAGE_SIZE: u32 = 50;

/// Result of deleting a channel: the channel's messages go with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDeletion {
    pub channel_id: String,
    pub messages_removed: usize,
}

/// Domain service over the channel and message stores.
///
/// Cheap to clone; one instance is built at startup and shared through
/// the dispatcher state.
#[derive(Clone)]
pub struct ChatService {
    channels: ChannelStore,
    messages: MessageStore,
    events: EventQueue,
}

impl ChatService {
    pub fn new(channels: ChannelStore, messages: MessageStore, events: EventQueue) -> Self {
        Self {
            channels,
            messages,
            events,
        }
    }

    /// Creates a channel owned by the caller.
    ///
    /// The name is required, must be non-empty, and must not collide
    /// with an existing channel. A missing description becomes "".
    pub async fn create_channel(
        &self,
        caller: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Channel, ApiError> {
        let name = require_field(name, "name")?;

        if self.channels.get_by_name(&name).await?.is_some() {
            return Err(ApiError::Conflict(format!(
                "channel name already in use: {name}"
            )));
        }

        let channel = self
            .channels
            .insert(NewChannel {
                name: name.clone(),
                description: description.unwrap_or_default(),
                creator: caller.to_string(),
            })
            .await
            .map_err(|e| duplicate_name_to_conflict(e, &name))?;

        tracing::info!(channel_id = %channel.id, creator = %caller, "channel created");
        self.events
            .publish(&Event::ChannelCreated {
                channel: channel.clone(),
            })
            .await?;

        Ok(channel)
    }

    /// Lists all channels, ordered by name.
    pub async fn list_channels(&self) -> Result<Vec<Channel>, ApiError> {
        Ok(self.channels.list().await?)
    }

    /// Returns the most recent messages in a channel, newest first.
    ///
    /// Fails with 404 when the channel does not exist, so a client can
    /// tell a missing channel from an empty one.
    pub async fn list_messages(&self, channel_id: &str) -> Result<Vec<Message>, ApiError> {
        self.channels.get(channel_id).await?;
        Ok(self.messages.list(channel_id, MESSAGE_PAGE_SIZE).await?)
    }

    /// Posts a message into an existing channel.
    pub async fn post_message(
        &self,
        caller: &str,
        channel_id: &str,
        body: Option<String>,
    ) -> Result<Message, ApiError> {
        let body = require_field(body, "body")?;
        let channel = self.channels.get(channel_id).await?;

        let message = self
            .messages
            .insert(NewMessage {
                channel_id: channel.id,
                body,
                creator: caller.to_string(),
            })
            .await?;

        self.events
            .publish(&Event::MessageCreated {
                message: message.clone(),
            })
            .await?;

        Ok(message)
    }

    /// Applies a partial update to a channel the caller created.
    ///
    /// Renaming onto another channel's name is a conflict; renaming a
    /// channel to its current name is a no-op rename and allowed.
    pub async fn update_channel(
        &self,
        caller: &str,
        channel_id: &str,
        patch: ChannelPatch,
    ) -> Result<Channel, ApiError> {
        let existing = self.channels.get(channel_id).await?;
        if existing.creator != caller {
            return Err(ApiError::Forbidden(
                "only the channel creator can update it".to_string(),
            ));
        }

        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(ApiError::Validation("name must not be empty".to_string()));
            }
            if let Some(other) = self.channels.get_by_name(name).await? {
                if other.id != existing.id {
                    return Err(ApiError::Conflict(format!(
                        "channel name already in use: {name}"
                    )));
                }
            }
        }

        let renamed_to = patch.name.clone();
        let channel = self
            .channels
            .update(channel_id, patch)
            .await
            .map_err(|e| match renamed_to {
                Some(name) => duplicate_name_to_conflict(e, &name),
                None => e.into(),
            })?;

        self.events
            .publish(&Event::ChannelUpdated {
                channel: channel.clone(),
            })
            .await?;

        Ok(channel)
    }

    /// Deletes a channel the caller created, along with its messages.
    pub async fn delete_channel(
        &self,
        caller: &str,
        channel_id: &str,
    ) -> Result<ChannelDeletion, ApiError> {
        let existing = self.channels.get(channel_id).await?;
        if existing.creator != caller {
            return Err(ApiError::Forbidden(
                "only the channel creator can delete it".to_string(),
            ));
        }

        // Messages reference the channel row, so they go first.
        let messages_removed = self.messages.delete_all_for_channel(channel_id).await?;
        self.channels.delete(channel_id).await?;

        tracing::info!(
            channel_id = %channel_id,
            messages_removed,
            "channel deleted"
        );
        self.events
            .publish(&Event::ChannelDeleted {
                channel_id: channel_id.to_string(),
                messages_removed,
            })
            .await?;

        Ok(ChannelDeletion {
            channel_id: channel_id.to_string(),
            messages_removed,
        })
    }

    /// Replaces the body of a message the caller created.
    pub async fn update_message(
        &self,
        caller: &str,
        message_id: &str,
        body: Option<String>,
    ) -> Result<Message, ApiError> {
        let body = require_field(body, "body")?;

        let existing = self.messages.get(message_id).await?;
        if existing.creator != caller {
            return Err(ApiError::Forbidden(
                "only the message creator can update it".to_string(),
            ));
        }

        let message = self.messages.update_body(message_id, &body).await?;

        self.events
            .publish(&Event::MessageUpdated {
                message: message.clone(),
            })
            .await?;

        Ok(message)
    }

    /// Deletes a message the caller created.
    pub async fn delete_message(&self, caller: &str, message_id: &str) -> Result<(), ApiError> {
        let existing = self.messages.get(message_id).await?;
        if existing.creator != caller {
            return Err(ApiError::Forbidden(
                "only the message creator can delete it".to_string(),
            ));
        }

        self.messages.delete(message_id).await?;

        self.events
            .publish(&Event::MessageDeleted {
                message_id: message_id.to_string(),
            })
            .await?;

        Ok(())
    }
}

/// Extracts a required request field, rejecting missing or empty values.
fn require_field(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{field} is required"))),
    }
}

/// Maps a unique-constraint failure on `channels.name` to a conflict.
///
/// The `get_by_name` pre-check is not transactional with the write, so
/// two racers can both pass it; the loser's insert or rename then hits
/// the UNIQUE index and must still surface as 409, not 500.
fn duplicate_name_to_conflict(err: StoreError, name: &str) -> ApiError {
    if err.is_constraint_violation() {
        ApiError::Conflict(format!("channel name already in use: {name}"))
    } else {
        err.into()
    }
}
