use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde_json::{Value, json};
use std::sync::Arc;

use super::lenient_json;
use crate::error::ApiError;
use crate::models::{ClearRequest, DEFAULT_USER_ID, MessagesQuery};
use crate::state::AppState;

pub async fn get_messages_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let messages = state.memory.get_history(&query.user_id, Some(query.limit));
    Ok(Json(json!({
        "success": true,
        "count": messages.len(),
        "messages": messages,
    })))
}

pub async fn clear_messages_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Json<Value> {
    let req: ClearRequest = lenient_json(&body);
    let user_id = req
        .user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
    if !state.memory.clear_history(&user_id) {
        tracing::debug!("No history to clear for user {}", user_id);
    }
    Json(json!({
        "success": true,
        "message": format!("Conversation history cleared for user: {}", user_id),
    }))
}

pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "success": true, "stats": state.memory.get_stats() }))
}
