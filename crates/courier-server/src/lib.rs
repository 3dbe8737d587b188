//! Courier server library logic.
//!
//! Wires the stores, domain service, event queue, and live connection
//! manager into an axum router. Everything under `/v1` requires a
//! gateway-verified `X-User` identity; `/health` is public.

pub mod api_channels;
pub mod api_messages;
pub mod api_ws;
pub mod config;
pub mod error;
pub mod middleware;
pub mod notifier;
pub mod service;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Extension, Json, Router,
};
use courier_db::DbPool;
use courier_events::EventQueue;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use api_ws::ConnectionManager;
use service::ChatService;

/// Maximum request body size (1 MiB). Message bodies are text; anything
/// larger is not a legitimate request.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Domain service over channels and messages.
    pub service: ChatService,
    /// Event publisher for committed mutations.
    pub events: EventQueue,
    /// Connection manager for WebSockets.
    pub connections: ConnectionManager,
}

impl AppState {
    /// Builds the full application state over an initialized pool.
    pub fn new(pool: DbPool, events: EventQueue) -> Self {
        let service = ChatService::new(
            courier_store::ChannelStore::new(pool.clone()),
            courier_store::MessageStore::new(pool.clone()),
            events.clone(),
        );
        Self {
            pool,
            service,
            events,
            connections: ConnectionManager::new(),
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/v1/channels",
            get(api_channels::list_channels_handler).post(api_channels::create_channel_handler),
        )
        .route(
            "/v1/channels/{channelId}",
            get(api_channels::list_messages_handler)
                .post(api_channels::post_message_handler)
                .patch(api_channels::update_channel_handler)
                .delete(api_channels::delete_channel_handler),
        )
        .route(
            "/v1/messages/{messageId}",
            axum::routing::patch(api_messages::update_message_handler)
                .delete(api_messages::delete_message_handler),
        )
        .route("/v1/ws", get(api_ws::ws_handler))
        .layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
