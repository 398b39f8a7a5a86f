// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /telegram/webhook (reaction event feeding the ledger)
// - GET /debug/posts (+ destination filter)

use std::sync::Arc;

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use feed_autoposter::api::{self, AppState};
use feed_autoposter::store::{PublishedPost, Store};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn seeded_state() -> (Arc<Store>, Router) {
    let store = Arc::new(Store::in_memory());
    store.upsert_destination(-100, "Chat");
    store.commit_published(PublishedPost {
        destination_id: -100,
        message_id: 55,
        provenance: "HackerNews".to_string(),
        title: "Fresh".to_string(),
        fingerprint: "fp-1".to_string(),
        positive: 0,
        negative: 0,
        created_ts: 42,
    });
    store.upsert_destination(-200, "Other");
    store.commit_published(PublishedPost {
        destination_id: -200,
        message_id: 9,
        provenance: "Dev.to".to_string(),
        title: "Other post".to_string(),
        fingerprint: "fp-2".to_string(),
        positive: 0,
        negative: 0,
        created_ts: 43,
    });
    let router = api::create_router(AppState {
        store: store.clone(),
    });
    (store, router)
}

#[tokio::test]
async fn health_returns_200_and_ok_body() {
    let (_store, app) = seeded_state();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn webhook_reaction_updates_the_ledger() {
    let (store, app) = seeded_state();

    let payload = json!({
        "update_id": 1,
        "message_reaction": {
            "chat": {"id": -100, "title": "Chat"},
            "message_id": 55,
            "new_reaction": [{"type": "emoji", "emoji": "👍"}]
        }
    });
    let req = Request::builder()
        .method("POST")
        .uri("/telegram/webhook")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /telegram/webhook");

    let resp = app.oneshot(req).await.expect("oneshot webhook");
    assert!(resp.status().is_success());

    let post = &store.posts(Some(-100))[0];
    assert_eq!(post.positive, 1);
}

#[tokio::test]
async fn debug_posts_lists_rows_with_iso_timestamps() {
    let (_store, app) = seeded_state();

    let req = Request::builder()
        .method("GET")
        .uri("/debug/posts")
        .body(Body::empty())
        .expect("build GET /debug/posts");

    let resp = app.oneshot(req).await.expect("oneshot /debug/posts");
    assert!(resp.status().is_success());

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse posts json");
    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 2);
    let first = &arr[0];
    assert!(first.get("provenance").is_some());
    assert!(first.get("positive").is_some());
    let ts = first.get("created_at").and_then(|t| t.as_str()).unwrap_or("");
    assert!(ts.starts_with("1970-01-01T"), "got '{ts}'");
}

#[tokio::test]
async fn debug_posts_filters_by_destination() {
    let (_store, app) = seeded_state();

    let req = Request::builder()
        .method("GET")
        .uri("/debug/posts?destination=-200")
        .body(Body::empty())
        .expect("build filtered GET");

    let resp = app.oneshot(req).await.expect("oneshot filtered");
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse posts json");
    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0].get("destination_id").and_then(Json::as_i64), Some(-200));
}
