//! WebSocket endpoint and connection management for live event fanout.
//!
//! Every connected client receives every event; there is no per-channel
//! or per-user filtering. Each connection gets a bounded outbound queue
//! so one slow client cannot hold back delivery to the rest.

use crate::middleware::Identity;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message as WsFrame, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Outbound queue depth per connection. Past this the client is too slow
/// and the connection is dropped.
const OUTBOUND_QUEUE_DEPTH: usize = 256;

/// Manages active WebSocket connections.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    connections: Arc<RwLock<HashMap<Uuid, mpsc::Sender<String>>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns its ID.
    pub async fn add(&self, sender: mpsc::Sender<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.connections.write().await.insert(id, sender);
        id
    }

    /// Removes a connection. Removing an already-removed ID is a no-op.
    pub async fn remove(&self, id: Uuid) {
        self.connections.write().await.remove(&id);
    }

    /// Number of currently registered connections.
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Sends a payload to every registered connection.
    ///
    /// A connection whose outbound queue is full or closed is evicted;
    /// delivery to the remaining connections is unaffected.
    pub async fn broadcast_all(&self, payload: &str) {
        let mut failed = Vec::new();
        {
            let connections = self.connections.read().await;
            for (id, sender) in connections.iter() {
                if let Err(e) = sender.try_send(payload.to_string()) {
                    tracing::warn!(
                        connection_id = %id,
                        "dropping slow or closed websocket connection: {}",
                        e
                    );
                    failed.push(*id);
                }
            }
        }

        if !failed.is_empty() {
            let mut connections = self.connections.write().await;
            for id in failed {
                connections.remove(&id);
            }
        }
    }
}

/// GET /v1/ws
///
/// Sits behind the identity middleware like every other versioned route,
/// so an unauthenticated upgrade attempt is rejected with 401 before it
/// reaches this handler.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(Identity(caller)): Extension<Identity>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, caller))
}

/// Drives one WebSocket connection until the client goes away.
///
/// Inbound frames are drained and discarded; this endpoint is
/// push-only. Mutations arrive over HTTP.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, caller: String) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_DEPTH);
    let id = state.connections.add(tx).await;
    tracing::info!(connection_id = %id, user = %caller, "websocket connected");

    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(WsFrame::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = receiver.next().await {
        if let WsFrame::Close(_) = frame {
            break;
        }
    }

    state.connections.remove(id).await;
    send_task.abort();
    tracing::info!(connection_id = %id, user = %caller, "websocket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        let manager = ConnectionManager::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        manager.add(tx_a).await;
        manager.add(tx_b).await;

        manager.broadcast_all("hello").await;

        assert_eq!(rx_a.recv().await.as_deref(), Some("hello"));
        assert_eq!(rx_b.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn full_queue_evicts_only_the_slow_connection() {
        let manager = ConnectionManager::new();
        let (tx_slow, _rx_slow) = mpsc::channel(1);
        let (tx_ok, mut rx_ok) = mpsc::channel(8);
        manager.add(tx_slow).await;
        manager.add(tx_ok).await;

        // Fill the slow connection's queue so the next send fails.
        manager.broadcast_all("first").await;
        manager.broadcast_all("second").await;

        assert_eq!(manager.count().await, 1, "slow connection evicted");
        assert_eq!(rx_ok.recv().await.as_deref(), Some("first"));
        assert_eq!(rx_ok.recv().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn closed_receiver_is_evicted_on_broadcast() {
        let manager = ConnectionManager::new();
        let (tx, rx) = mpsc::channel(8);
        manager.add(tx).await;
        drop(rx);

        manager.broadcast_all("anyone there").await;
        assert_eq!(manager.count().await, 0);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = mpsc::channel(8);
        let id = manager.add(tx).await;

        manager.remove(id).await;
        manager.remove(id).await;
        assert_eq!(manager.count().await, 0);
    }
}
