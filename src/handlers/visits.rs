use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde_json::{Value, json};
use std::sync::Arc;

use super::lenient_json;
use crate::error::ApiError;
use crate::models::VisitRequest;
use crate::state::AppState;

pub async fn get_visits_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let counts = state.visits.counts().await;
    Json(json!({ "success": true, "total": counts.total, "pages": counts.pages }))
}

pub async fn post_visits_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let req: VisitRequest = lenient_json(&body);
    let update = state
        .visits
        .increment(req.path.as_deref())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to record visit: {}", e)))?;
    Ok(Json(json!({
        "success": true,
        "path": update.path,
        "total": update.total,
        "page_total": update.page_total,
        "pages": update.pages,
    })))
}
