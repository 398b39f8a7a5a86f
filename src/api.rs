// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::cors::CorsLayer;

use crate::delivery::Update;
use crate::reactions;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/telegram/webhook", post(telegram_webhook))
        .route("/debug/posts", get(debug_posts))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Push alternative to the long-poll loop: accepts the same Update payloads
/// Telegram would deliver to a registered webhook.
async fn telegram_webhook(
    State(state): State<AppState>,
    Json(update): Json<Update>,
) -> &'static str {
    reactions::handle_update(&state.store, &update);
    "ok"
}

#[derive(Deserialize)]
struct PostsQuery {
    #[serde(default)]
    destination: Option<i64>,
}

#[derive(Serialize)]
struct PostView {
    destination_id: i64,
    message_id: i64,
    provenance: String,
    title: String,
    positive: u32,
    negative: u32,
    created_at: String,
}

async fn debug_posts(
    State(state): State<AppState>,
    Query(q): Query<PostsQuery>,
) -> Json<Vec<PostView>> {
    let views = state
        .store
        .posts(q.destination)
        .into_iter()
        .map(|p| PostView {
            destination_id: p.destination_id,
            message_id: p.message_id,
            provenance: p.provenance,
            title: p.title,
            positive: p.positive,
            negative: p.negative,
            created_at: iso_ts(p.created_ts),
        })
        .collect();
    Json(views)
}

fn iso_ts(ts: u64) -> String {
    OffsetDateTime::from_unix_timestamp(ts as i64)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_default()
}
