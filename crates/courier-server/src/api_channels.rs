//! HTTP handlers for the channel collection.

use crate::middleware::Identity;
use crate::service::ChannelDeletion;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::Json,
};
use courier_store::ChannelPatch;
use courier_types::{Channel, Message};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;

/// Body for channel creation. Fields are optional so a missing `name`
/// surfaces as a validation error instead of a deserialization failure.
#[derive(Deserialize)]
pub struct CreateChannelRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Body for a partial channel update. Absent fields are left untouched.
#[derive(Deserialize)]
pub struct UpdateChannelRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Body for posting a message into a channel.
#[derive(Deserialize)]
pub struct PostMessageRequest {
    pub body: Option<String>,
}

/// Response for a channel deletion.
#[derive(Serialize)]
pub struct DeleteChannelResponse {
    pub deleted: bool,
    #[serde(rename = "messagesRemoved")]
    pub messages_removed: usize,
}

impl From<ChannelDeletion> for DeleteChannelResponse {
    fn from(d: ChannelDeletion) -> Self {
        Self {
            deleted: true,
            messages_removed: d.messages_removed,
        }
    }
}

/// GET /v1/channels
pub async fn list_channels_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Channel>>, ApiError> {
    Ok(Json(state.service.list_channels().await?))
}

/// POST /v1/channels
pub async fn create_channel_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Identity(caller)): Extension<Identity>,
    Json(payload): Json<CreateChannelRequest>,
) -> Result<Json<Channel>, ApiError> {
    let channel = state
        .service
        .create_channel(&caller, payload.name, payload.description)
        .await?;
    Ok(Json(channel))
}

/// GET /v1/channels/{id}
pub async fn list_messages_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.service.list_messages(&channel_id).await?))
}

/// POST /v1/channels/{id}
pub async fn post_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Identity(caller)): Extension<Identity>,
    Path(channel_id): Path<String>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let message = state
        .service
        .post_message(&caller, &channel_id, payload.body)
        .await?;
    Ok(Json(message))
}

/// PATCH /v1/channels/{id}
pub async fn update_channel_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Identity(caller)): Extension<Identity>,
    Path(channel_id): Path<String>,
    Json(payload): Json<UpdateChannelRequest>,
) -> Result<Json<Channel>, ApiError> {
    let patch = ChannelPatch {
        name: payload.name,
        description: payload.description,
    };
    let channel = state
        .service
        .update_channel(&caller, &channel_id, patch)
        .await?;
    Ok(Json(channel))
}

/// DELETE /v1/channels/{id}
pub async fn delete_channel_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Identity(caller)): Extension<Identity>,
    Path(channel_id): Path<String>,
) -> Result<Json<DeleteChannelResponse>, ApiError> {
    let deletion = state.service.delete_channel(&caller, &channel_id).await?;
    Ok(Json(deletion.into()))
}
