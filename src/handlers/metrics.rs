use axum::http::header;
use axum::response::IntoResponse;

use crate::error::ApiError;
use crate::metrics::render;

pub async fn metrics_handler() -> Result<impl IntoResponse, ApiError> {
    let body = render().map_err(ApiError::Internal)?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
