//! `/predict` axum boundary: maps proxy results to HTTP responses.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;

use modelwatch_core::error::ModelWatchError;

use crate::app_state::AppState;

/// `{"error": "<message>"}` with the status mapped from the error code.
/// Backend detail is logged by the proxy, never echoed here.
pub fn error_response(err: &ModelWatchError) -> Response {
    let status = StatusCode::from_u16(err.client_code().http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err.client_message() }))).into_response()
}

/// `POST /predict`
pub async fn predict(State(app): State<AppState>, body: Bytes) -> Response {
    match app.proxy().handle(body).await {
        Ok(out) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            out,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
