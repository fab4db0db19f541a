use axum::Json;
use serde_json::{Value, json};

// liveness probe used by the deploy runbook, the body is checked verbatim
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
