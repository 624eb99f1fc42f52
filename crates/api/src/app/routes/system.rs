use axum::{http::StatusCode, response::Response, Json};
use serde_json::{json, Value};

use crate::app::errors::json_error;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Router-wide fallback for paths no route matches.
pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "route not found")
}

/// Per-route fallback for methods the route does not serve.
pub async fn method_not_allowed() -> Response {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}
