use crate::dto::HealthResponse;
use axum::Json;
use chrono::Utc;

/// GET /health
/// Response: 200 OK with JSON
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().timestamp(),
    })
}
