use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

pub fn ok<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::OK, Json(data)).into_response()
}

pub fn created<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::CREATED, Json(data)).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Error bodies are keyed by the offending field, or `detail` when the
/// problem is not about one field: `{"end_time": "...", "code": "..."}`.
pub fn error(key: &str, message: impl Into<String>, code: &str, status: StatusCode) -> Response {
    let mut body = Map::new();
    body.insert(key.to_string(), Value::String(message.into()));
    body.insert("code".to_string(), Value::String(code.to_string()));

    (status, Json(Value::Object(body))).into_response()
}
