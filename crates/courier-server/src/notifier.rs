//! Bridges the durable event queue to live WebSocket connections.

use courier_events::EventQueue;
use tokio::sync::broadcast::error::RecvError;

use crate::api_ws::ConnectionManager;

/// Forwards published events to every connected client until the
/// publisher is dropped.
///
/// Spawned once at startup. A notifier that falls behind the broadcast
/// buffer skips the missed events and keeps going; clients reconcile
/// through the HTTP read endpoints, not through replay.
pub async fn run_notifier(events: EventQueue, connections: ConnectionManager) {
    let mut rx = events.subscribe();
    tracing::info!(queue = %events.queue_name(), "live notifier started");
    // Hold only the receiver; a retained publisher handle would keep the
    // broadcast channel open and the notifier would never observe Closed.
    drop(events);

    loop {
        match rx.recv().await {
            Ok(queued) => {
                tracing::debug!(
                    seq = queued.seq,
                    event_type = %queued.event_type,
                    "fanning out event"
                );
                connections.broadcast_all(&queued.payload_json).await;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "live notifier lagged, skipping missed events");
            }
            Err(RecvError::Closed) => {
                tracing::info!("event publisher dropped, live notifier stopping");
                break;
            }
        }
    }
}
