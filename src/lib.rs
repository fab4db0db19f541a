pub mod cache;
pub mod chatbot;
pub mod config;
pub mod dedup;
pub mod error;
pub mod gpt;
pub mod handlers;
pub mod heartbeat;
pub mod maps;
pub mod matcher;
pub mod memory;
pub mod metrics;
pub mod models;
pub mod places;
pub mod prompts;
pub mod rate_limit;
pub mod state;
pub mod text;
pub mod visits;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/query", post(query_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/messages", get(get_messages_handler))
        .route("/api/messages/stream", post(stream_handler))
        .route("/api/messages/clear", post(clear_messages_handler))
        .route("/api/messages/stats", get(stats_handler))
        .route("/api/visits", get(get_visits_handler).post(post_visits_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
