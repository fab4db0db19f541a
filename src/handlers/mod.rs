mod chat;
mod health;
mod messages;
mod metrics;
mod stream;
mod visits;

pub use chat::{chat_handler, query_handler};
pub use health::health_handler;
pub use messages::{clear_messages_handler, get_messages_handler, stats_handler};
pub use metrics::metrics_handler;
pub use stream::stream_handler;
pub use visits::{get_visits_handler, post_visits_handler};

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::InvalidRequest(e.body_text()))
}

// bodies where a missing or broken payload just means "use the defaults"
fn lenient_json<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::InvalidRequest(format!("{} is required", field))),
    }
}

fn timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}
