use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use courier_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use courier_events::{list_events, EventQueue};
use courier_server::{app, notifier::run_notifier, AppState};
use courier_types::Event;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

const QUEUE: &str = "courier-events";

async fn setup_state() -> (AppState, DbPool) {
    let settings = DbRuntimeSettings {
        pool_max_size: 1,
        ..DbRuntimeSettings::default()
    };
    let pool = create_pool(":memory:", settings).unwrap();
    {
        let conn = pool.get().unwrap();
        run_migrations(&conn).unwrap();
    }

    let events = EventQueue::new(pool.clone(), QUEUE, 64);
    (AppState::new(pool.clone(), events), pool)
}

fn json_request(method: &str, uri: &str, user: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("content-type", "application/json")
        .header("X-User", user)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_each_mutation_enqueues_exactly_one_event() {
    let (state, pool) = setup_state().await;
    let app = app(state);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/channels",
            "alice",
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let channel_id = response_json(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/v1/channels/{channel_id}"),
            "bob",
            serde_json::json!({ "body": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let message_id = response_json(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/v1/messages/{message_id}"),
            "bob",
            serde_json::json!({ "body": "edited" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/v1/channels/{channel_id}"),
            "alice",
            serde_json::json!({ "description": "updated" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/channels/{channel_id}"))
                .method("DELETE")
                .header("X-User", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let conn = pool.get().unwrap();
    let queued = list_events(&conn, QUEUE, 100).unwrap();

    let types: Vec<&str> = queued.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "channel-created",
            "message-created",
            "message-updated",
            "channel-updated",
            "channel-deleted",
        ]
    );

    let seqs: Vec<i64> = queued.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);

    // The channel-deleted payload carries the cascade count.
    let last: Event = serde_json::from_str(&queued[4].payload_json).unwrap();
    assert_eq!(
        last,
        Event::ChannelDeleted {
            channel_id,
            messages_removed: 1,
        }
    );
}

#[tokio::test]
async fn test_rejected_mutations_enqueue_nothing() {
    let (state, pool) = setup_state().await;
    let app = app(state);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/channels",
            "alice",
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .unwrap();
    let channel_id = response_json(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Duplicate name, missing body, and a forbidden update.
    let rejected = [
        json_request(
            "POST",
            "/v1/channels",
            "bob",
            serde_json::json!({ "name": "general" }),
        ),
        json_request(
            "POST",
            &format!("/v1/channels/{channel_id}"),
            "bob",
            serde_json::json!({}),
        ),
        json_request(
            "PATCH",
            &format!("/v1/channels/{channel_id}"),
            "bob",
            serde_json::json!({ "description": "nope" }),
        ),
    ];
    for request in rejected {
        let response = app.clone().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    let conn = pool.get().unwrap();
    let queued = list_events(&conn, QUEUE, 100).unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].event_type, "channel-created");
}

#[tokio::test]
async fn test_notifier_fans_out_to_every_connection() {
    let (state, _pool) = setup_state().await;
    tokio::spawn(run_notifier(
        state.events.clone(),
        state.connections.clone(),
    ));
    // Let the notifier task subscribe before anything publishes.
    tokio::task::yield_now().await;

    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    state.connections.add(tx_a).await;
    state.connections.add(tx_b).await;

    let app = app(state);
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/channels",
            "alice",
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload_a = rx_a.recv().await.unwrap();
    let payload_b = rx_b.recv().await.unwrap();
    assert_eq!(payload_a, payload_b);

    let event: Event = serde_json::from_str(&payload_a).unwrap();
    match event {
        Event::ChannelCreated { channel } => {
            assert_eq!(channel.name, "general");
            assert_eq!(channel.creator, "alice");
        }
        other => panic!("expected channel-created, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dead_connection_does_not_block_the_rest() {
    let (state, _pool) = setup_state().await;
    tokio::spawn(run_notifier(
        state.events.clone(),
        state.connections.clone(),
    ));
    tokio::task::yield_now().await;

    let (tx_dead, rx_dead) = mpsc::channel(8);
    let (tx_live, mut rx_live) = mpsc::channel(8);
    state.connections.add(tx_dead).await;
    state.connections.add(tx_live).await;
    drop(rx_dead);

    let connections = state.connections.clone();
    let app = app(state);
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/channels",
            "alice",
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = rx_live.recv().await.unwrap();
    let event: Event = serde_json::from_str(&payload).unwrap();
    assert!(matches!(event, Event::ChannelCreated { .. }));

    assert_eq!(connections.count().await, 1, "dead connection evicted");
}
