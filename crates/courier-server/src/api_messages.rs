//! HTTP handlers for individual messages.

use crate::middleware::Identity;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::Json,
};
use courier_types::Message;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;

/// Body for editing a message.
#[derive(Deserialize)]
pub struct UpdateMessageRequest {
    pub body: Option<String>,
}

/// PATCH /v1/messages/{id}
pub async fn update_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Identity(caller)): Extension<Identity>,
    Path(message_id): Path<String>,
    Json(payload): Json<UpdateMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let message = state
        .service
        .update_message(&caller, &message_id, payload.body)
        .await?;
    Ok(Json(message))
}

/// DELETE /v1/messages/{id}
///
/// Responds with a plain-text confirmation rather than a JSON body.
pub async fn delete_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Identity(caller)): Extension<Identity>,
    Path(message_id): Path<String>,
) -> Result<&'static str, ApiError> {
    state.service.delete_message(&caller, &message_id).await?;
    Ok("message deleted")
}
