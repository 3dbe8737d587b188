//! Shared domain types for the Courier messaging backend.
//!
//! Channels are named conversation containers owned by their creator;
//! messages belong to exactly one channel. Every committed mutation is
//! described by an [`Event`], the immutable notification that travels
//! from the mutation path to connected clients via the durable queue.

use serde::{Deserialize, Serialize};

/// A named conversation container.
///
/// The `id` is an opaque server-generated token; external consumers must
/// treat it as comparison-only. `name` is unique across all live channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Opaque unique identifier, assigned by the store on insert.
    pub id: String,
    /// Display name, unique across all channels.
    pub name: String,
    /// Optional free-form description; defaults to the empty string.
    pub description: String,
    /// Identity of the creator; immutable after creation.
    pub creator: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last-edit timestamp (RFC 3339); empty until the first update.
    pub edited_at: String,
}

/// A body of text posted into exactly one channel.
///
/// `channel_id` never changes once the message is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Opaque unique identifier, assigned by the store on insert.
    pub id: String,
    /// Identifier of the containing channel.
    #[serde(rename = "channelID")]
    pub channel_id: String,
    /// Message text.
    pub body: String,
    /// Identity of the author; immutable after creation.
    pub creator: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last-edit timestamp (RFC 3339); empty until the first update.
    pub edited_at: String,
}

/// An immutable notification describing one committed mutation.
///
/// Serialized with a `type` tag so consumers can dispatch on the variant
/// without knowing the full payload shape. Created/updated variants carry
/// the affected entity; deleted variants carry only its identifier.
/// Events carry no ordering guarantee across different producers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    ChannelCreated {
        channel: Channel,
    },
    ChannelUpdated {
        channel: Channel,
    },
    ChannelDeleted {
        #[serde(rename = "channelID")]
        channel_id: String,
        /// Number of messages removed by the cascade.
        #[serde(rename = "messagesRemoved")]
        messages_removed: usize,
    },
    MessageCreated {
        message: Message,
    },
    MessageUpdated {
        message: Message,
    },
    MessageDeleted {
        #[serde(rename = "messageID")]
        message_id: String,
    },
}

impl Event {
    /// Returns the canonical type string for this event, matching the
    /// `type` tag used on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ChannelCreated { .. } => "channel-created",
            Self::ChannelUpdated { .. } => "channel-updated",
            Self::ChannelDeleted { .. } => "channel-deleted",
            Self::MessageCreated { .. } => "message-created",
            Self::MessageUpdated { .. } => "message-updated",
            Self::MessageDeleted { .. } => "message-deleted",
        }
    }
}
