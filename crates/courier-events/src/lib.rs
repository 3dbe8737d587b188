//! Durable event queue for committed mutations.
//!
//! Every successful store mutation produces exactly one [`Event`]
//! (from `courier-types`), published here *after* the mutation commits.
//! Publishing does two things, in order:
//!
//! 1. Serializes the event and inserts a row into the `event_queue`
//!    table with a per-queue monotonically increasing sequence number —
//!    this is the durable, at-least-once record a consumer can drain.
//! 2. Sends the queued event over an in-process broadcast channel so the
//!    live notifier can fan it out to connected clients without polling.
//!
//! A publish failure never rolls back the mutation it describes; the
//! store commit is authoritative and event delivery is best-effort
//! notification. Consumers must tolerate duplicates.

use courier_db::DbPool;
use courier_types::Event;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur while publishing an event.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A single row from the `event_queue` table.
///
/// `payload_json` is the serialized [`Event`] envelope exactly as it is
/// delivered to push-transport clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedEvent {
    /// Auto-incremented row ID.
    pub id: i64,
    /// Name of the queue this event was enqueued on.
    pub queue: String,
    /// Monotonically increasing sequence number within the queue.
    pub seq: i64,
    /// The event's `type` tag (e.g. `channel-created`).
    pub event_type: String,
    /// The serialized event envelope.
    pub payload_json: String,
    /// Enqueue timestamp.
    pub created_at: String,
}

/// Writes a single event onto the named durable queue.
///
/// The sequence number is assigned atomically inside the INSERT via a
/// `COALESCE(MAX(seq), 0) + 1` subquery, so two concurrent publishers
/// cannot observe the same `MAX(seq)` and collide.
pub fn enqueue_event(
    conn: &Connection,
    queue: &str,
    event: &Event,
) -> Result<QueuedEvent, PublishError> {
    let payload_json = serde_json::to_string(event)?;

    let (id, seq, created_at) = conn.query_row(
        "INSERT INTO event_queue (queue, seq, event_type, payload_json, created_at)
         VALUES (
            ?1,
            (SELECT COALESCE(MAX(seq), 0) + 1 FROM event_queue WHERE queue = ?1),
            ?2,
            ?3,
            datetime('now')
         )
         RETURNING id, seq, created_at",
        params![queue, event.event_type(), payload_json],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    )?;

    Ok(QueuedEvent {
        id,
        queue: queue.to_string(),
        seq,
        event_type: event.event_type().to_string(),
        payload_json,
        created_at,
    })
}

/// Reads events from the named queue in enqueue order, bounded by `limit`.
///
/// Used by consumers reconciling after a disconnect and by tests
/// asserting that each mutation enqueued exactly one event.
pub fn list_events(
    conn: &Connection,
    queue: &str,
    limit: u32,
) -> Result<Vec<QueuedEvent>, PublishError> {
    let mut stmt = conn.prepare(
        "SELECT id, queue, seq, event_type, payload_json, created_at
         FROM event_queue
         WHERE queue = ?1
         ORDER BY seq ASC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![queue, limit], |row| {
        Ok(QueuedEvent {
            id: row.get(0)?,
            queue: row.get(1)?,
            seq: row.get(2)?,
            event_type: row.get(3)?,
            payload_json: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Handle to the event publisher.
///
/// Constructed once at process start and shared by clone; the broadcast
/// sender is the only path from the mutation side to the live notifier.
#[derive(Clone)]
pub struct EventQueue {
    pool: DbPool,
    queue: String,
    tx: broadcast::Sender<QueuedEvent>,
}

impl EventQueue {
    /// Creates a publisher for the named queue.
    ///
    /// `capacity` bounds the in-process broadcast buffer; a notifier that
    /// falls further behind than this observes a lag error and skips
    /// ahead rather than blocking publishers.
    pub fn new(pool: DbPool, queue: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            pool,
            queue: queue.into(),
            tx,
        }
    }

    /// The queue name this publisher enqueues onto.
    pub fn queue_name(&self) -> &str {
        &self.queue
    }

    /// Subscribes to live events. New subscribers receive no replay of
    /// past events — only what is published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<QueuedEvent> {
        self.tx.subscribe()
    }

    /// Serializes and enqueues an event, then notifies live subscribers.
    ///
    /// Returns once the queue row is committed. The broadcast send is
    /// fire-and-forget: having no connected subscriber is normal and not
    /// an error.
    pub async fn publish(&self, event: &Event) -> Result<QueuedEvent, PublishError> {
        let pool = self.pool.clone();
        let queue = self.queue.clone();
        let event = event.clone();

        let queued = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            enqueue_event(&conn, &queue, &event)
        })
        .await??;

        if let Err(e) = self.tx.send(queued.clone()) {
            tracing::debug!(
                queue = %self.queue,
                event_type = %queued.event_type,
                "no live subscribers for event: {}",
                e
            );
        }

        Ok(queued)
    }
}
