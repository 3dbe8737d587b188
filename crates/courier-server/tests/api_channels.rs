use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use courier_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use courier_events::EventQueue;
use courier_server::{app, AppState};
use serde_json::Value;
use tower::ServiceExt;

async fn setup_app() -> (axum::Router, DbPool) {
    // One pooled connection: each `:memory:` connection is its own database.
    let settings = DbRuntimeSettings {
        pool_max_size: 1,
        ..DbRuntimeSettings::default()
    };
    let pool = create_pool(":memory:", settings).unwrap();
    {
        let conn = pool.get().unwrap();
        run_migrations(&conn).unwrap();
    }

    let events = EventQueue::new(pool.clone(), "courier-events", 64);
    let state = AppState::new(pool.clone(), events);
    (app(state), pool)
}

fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("X-User", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_create_channel_success() {
    let (app, _pool) = setup_app().await;

    let body = serde_json::json!({ "name": "general", "description": "town square" });
    let response = app
        .oneshot(json_request("POST", "/v1/channels", Some("alice"), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["name"], "general");
    assert_eq!(json["description"], "town square");
    assert_eq!(json["creator"], "alice");
    assert_eq!(json["editedAt"], "");
    assert!(json["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(json["createdAt"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_create_channel_defaults_description_to_empty() {
    let (app, _pool) = setup_app().await;

    let body = serde_json::json!({ "name": "general" });
    let response = app
        .oneshot(json_request("POST", "/v1/channels", Some("alice"), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["description"], "");
}

#[tokio::test]
async fn test_create_channel_requires_name() {
    let (app, _pool) = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/channels",
            Some("alice"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/channels",
            Some("alice"),
            serde_json::json!({ "name": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_channel_duplicate_name_conflicts() {
    let (app, _pool) = setup_app().await;

    let body = serde_json::json!({ "name": "general" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/v1/channels", Some("alice"), body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request("POST", "/v1/channels", Some("bob"), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_versioned_routes_require_identity() {
    let (app, _pool) = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/channels",
            None,
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/channels")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_identity_accepts_gateway_json_header() {
    let (app, _pool) = setup_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/channels")
                .method("POST")
                .header("content-type", "application/json")
                .header("X-User", r#"{"id": 7, "userName": "alice"}"#)
                .body(Body::from(
                    serde_json::json!({ "name": "general" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["creator"], "alice");
}

#[tokio::test]
async fn test_list_channels_ordered_by_name() {
    let (app, _pool) = setup_app().await;

    for name in ["zulu", "alpha", "mike"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/channels",
                Some("alice"),
                serde_json::json!({ "name": name }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/channels")
                .header("X-User", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alpha", "mike", "zulu"]);
}

#[tokio::test]
async fn test_update_channel_creator_only() {
    let (app, _pool) = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/channels",
            Some("alice"),
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .unwrap();
    let channel = response_json(response).await;
    let id = channel["id"].as_str().unwrap();

    let patch = serde_json::json!({ "description": "bob was here" });
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/v1/channels/{id}"),
            Some("bob"),
            patch.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/v1/channels/{id}"),
            Some("alice"),
            patch,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["description"], "bob was here");
    assert!(json["editedAt"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_update_unknown_channel_is_not_found() {
    let (app, _pool) = setup_app().await;

    let response = app
        .oneshot(json_request(
            "PATCH",
            "/v1/channels/no-such-channel",
            Some("alice"),
            serde_json::json!({ "description": "ghost" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_channel_creator_only() {
    let (app, _pool) = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/channels",
            Some("alice"),
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .unwrap();
    let channel = response_json(response).await;
    let id = channel["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/v1/channels/{id}"))
                .method("DELETE")
                .header("X-User", "bob")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/channels/{id}"))
                .method("DELETE")
                .header("X-User", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["deleted"], true);
    assert_eq!(json["messagesRemoved"], 0);
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _pool) = setup_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["status"], "ok");
}
