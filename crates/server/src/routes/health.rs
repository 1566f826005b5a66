use axum::{Router, response::Json as ResponseJson, routing::get};
use serde_json::{Value, json};

use crate::AppState;

/// GET /health
pub async fn health() -> ResponseJson<Value> {
    ResponseJson(json!({ "message": "ok" }))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/health", get(health))
}
