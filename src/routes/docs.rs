use crate::error::AppError;
use axum::{Router, http::header, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Subscription Service API",
        version = "1.0.0",
        description = "CRUD and cost aggregation for user subscriptions"
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::subscriptions::create_subscription,
        crate::routes::subscriptions::list_subscriptions,
        crate::routes::subscriptions::subscriptions_summary,
        crate::routes::subscriptions::get_subscription,
        crate::routes::subscriptions::update_subscription,
        crate::routes::subscriptions::delete_subscription,
    ),
    components(
        schemas(
            crate::routes::ApiErrorResponse,
            crate::routes::health::HealthResponse,
            crate::subscription::SubscriptionPayload,
            crate::subscription::SubscriptionResponse,
            crate::subscription::SubscriptionListResponse,
            crate::subscription::SummaryResponse,
            crate::subscription::StatusResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness check"),
        (name = "Subscriptions", description = "Subscription management and cost summary"),
    )
)]
pub struct ApiDoc;

/// Create documentation routes
pub fn create_docs_routes() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger").url("/swagger/openapi.json", ApiDoc::openapi()))
        .route("/swagger/openapi.yaml", get(openapi_yaml))
}

/// Serve OpenAPI specification as YAML
async fn openapi_yaml() -> Result<([(header::HeaderName, &'static str); 1], String), AppError> {
    let spec = ApiDoc::openapi();
    let yaml = serde_yaml_ng::to_string(&spec).map_err(|e| {
        AppError::Internal(format!("Failed to serialize OpenAPI spec to YAML: {e}"))
    })?;

    Ok(([(header::CONTENT_TYPE, "application/yaml")], yaml))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get(uri: &str) -> axum::response::Response {
        let app = create_docs_routes();
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap()
    }

    #[test]
    fn test_openapi_lists_subscription_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/healthz",
            "/subscriptions/",
            "/subscriptions/summary",
            "/subscriptions/{id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[tokio::test]
    async fn test_openapi_json() {
        let response = get("/swagger/openapi.json").await;
        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("application/json"));
    }

    #[tokio::test]
    async fn test_openapi_yaml() {
        let response = get("/swagger/openapi.yaml").await;
        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("application/yaml"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("Subscription Service API"));
    }

    #[tokio::test]
    async fn test_swagger_ui() {
        let response = get("/swagger").await;
        // Swagger UI redirects to the trailing-slash path
        assert!(response.status().is_redirection() || response.status() == StatusCode::OK);
    }
}
