pub mod reward;

use crate::keys::KeySource;
use crate::verifier::CallbackVerifier;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, Router},
    Json,
};
use serde_json::json;
use std::sync::Arc;

pub fn build<S: KeySource + 'static>(verifier: Arc<CallbackVerifier<S>>) -> Router {
    Router::new()
        .fallback(fallback)
        .route("/", get(status))
        .route("/healthz", get(health).options(health))
        .merge(reward::build(verifier))
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "message": format!("{} is running", crate::agent_string()),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
