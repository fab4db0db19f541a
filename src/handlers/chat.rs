use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;

use super::{parse_json, required, timestamp};
use crate::error::ApiError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{ChatResult, DEFAULT_USER_ID, QueryRequest, Role};
use crate::rate_limit::client_key;
use crate::state::AppState;

// validate, rate limit, answer with history, then record both turns
async fn answer(
    state: &AppState,
    headers: &HeaderMap,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<ChatResult, ApiError> {
    let req = parse_json(payload)?;
    let message = required(req.message, "Message")?;
    let user_id = req.user_id.unwrap_or_else(|| DEFAULT_USER_ID.to_string());

    if !state.rate_limiter.check(&client_key(headers)) {
        return Err(ApiError::RateLimited);
    }
    REQUEST_TOTAL.inc();
    let start = Instant::now();

    let history = state.memory.get_history(&user_id, None);
    let result = state.chatbot.get_chat_response(&message, &user_id, &history).await;

    state.memory.add_message(&user_id, Role::User, &message);
    state.memory.add_message(&user_id, Role::Assistant, &result.response);

    REQUEST_LATENCY.observe(start.elapsed().as_secs_f64());
    tracing::info!(
        "Answered for user {} from {} in {:?}",
        user_id,
        result.source,
        start.elapsed()
    );
    Ok(result)
}

pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let result = answer(&state, &headers, payload).await?;
    Ok(Json(json!({
        "success": true,
        "response": result.response,
        "structured_data": result.structured_data,
        "language": result.language,
        "intent": result.intent,
        "source": result.source,
        "tokens_used": result.tokens_used,
        "model": result.model,
        "character": result.character,
        "timestamp": timestamp(),
    })))
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let result = answer(&state, &headers, payload).await?;
    Ok(Json(json!({
        "success": true,
        "response": result.response,
        "timestamp": timestamp(),
    })))
}
