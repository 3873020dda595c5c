use crate::dtos::StatusResponse;
use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Liveness check with the service identity and build version.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "analyze-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `GET /`. The payload is fixed; existing frontends compare it verbatim.
pub async fn root_status() -> impl IntoResponse {
    Json(StatusResponse {
        status: "healthy".to_string(),
        message: "Flask API is running".to_string(),
    })
}
