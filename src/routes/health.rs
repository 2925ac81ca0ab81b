use axum::{Router, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness check body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Create health check routes
///
/// Liveness only: the check never touches the database, so a slow or
/// unreachable store does not get the process restarted.
pub fn create_health_routes() -> Router {
    Router::new().route("/healthz", get(health_check))
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/healthz",
    summary = "Liveness check",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
