//! Health check handlers

use axum::Json;
use serde::{Deserialize, Serialize};

/// Greeting response
#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    /// Greeting text
    pub message: String,
    /// Always `ok`
    pub status: String,
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy`
    pub status: String,
    /// Crate version
    pub version: String,
    /// Human-readable message
    pub message: String,
}

/// GET /
pub async fn hello_world() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from Person Registry Backend!".to_string(),
        status: "ok".to_string(),
    })
}

/// GET /api/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Backend is healthy".to_string(),
    })
}
