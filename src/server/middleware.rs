use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{str::FromStr, time::Duration};
use tracing::{info, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

#[derive(Clone, Copy, Debug)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self(Uuid::nil())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extension trait to read the request ID back out of request extensions
pub trait RequestIdExt {
    fn request_id(&self) -> RequestId;
}

impl RequestIdExt for axum::http::Extensions {
    fn request_id(&self) -> RequestId {
        self.get::<RequestId>().copied().unwrap_or_default()
    }
}

/// Tag every request with an ID and echo it in the `X-Request-ID` response
/// header. A valid UUID supplied by the caller (e.g. a load balancer) is kept.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::from_str(s).ok())
        .map(RequestId)
        .unwrap_or_else(RequestId::new);

    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-request-id"), header_value);
    }

    response
}

/// Structured request/response logging
pub async fn request_response_logger(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    // Swagger UI assets are noise
    if path.starts_with("/swagger") {
        return next.run(req).await;
    }

    let request_id = req.extensions().request_id();
    info!(
        method = %method,
        path = %path,
        request_id = %request_id,
        "API request"
    );

    let start = std::time::Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed();

    info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        latency_ms = %duration.as_millis(),
        request_id = %request_id,
        "API response"
    );

    response
}

/// Abort handlers that run longer than the configured limit with a 504
pub async fn request_timeout(State(limit): State<Duration>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, timeout_ms = %limit.as_millis(), "Request timed out");
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({ "error": "request timed out" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        extract::Extension,
        http::{Method, Request as HttpRequest},
        middleware,
        routing::get,
    };
    use tower::ServiceExt;

    async fn echo_request_id(Extension(request_id): Extension<RequestId>) -> String {
        request_id.to_string()
    }

    async fn slow_handler() -> &'static str {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "done"
    }

    fn request(uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_id_generated() {
        let app = Router::new()
            .route("/test", get(echo_request_id))
            .layer(middleware::from_fn(request_id_middleware));

        let response = app.oneshot(request("/test")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let header = response
            .headers()
            .get("x-request-id")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(Uuid::from_str(&header).is_ok());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, header.as_bytes());
    }

    #[tokio::test]
    async fn test_request_id_preserved() {
        let existing_id = Uuid::new_v4();
        let app = Router::new()
            .route("/test", get(echo_request_id))
            .layer(middleware::from_fn(request_id_middleware));

        let request = HttpRequest::builder()
            .uri("/test")
            .header(REQUEST_ID_HEADER, existing_id.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let returned_id = response.headers().get("x-request-id").unwrap();
        assert_eq!(returned_id.to_str().unwrap(), existing_id.to_string());
    }

    #[tokio::test]
    async fn test_request_id_replaces_garbage() {
        let app = Router::new()
            .route("/test", get(echo_request_id))
            .layer(middleware::from_fn(request_id_middleware));

        let request = HttpRequest::builder()
            .uri("/test")
            .header(REQUEST_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let returned_id = response.headers().get("x-request-id").unwrap();
        assert_ne!(returned_id.to_str().unwrap(), "not-a-uuid");
    }

    #[test]
    fn test_request_id_default_is_nil() {
        let extensions = axum::http::Extensions::new();
        assert_eq!(extensions.request_id().uuid(), Uuid::nil());
        assert_ne!(RequestId::new().uuid(), RequestId::new().uuid());
    }

    #[tokio::test]
    async fn test_logger_passes_response_through() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_response_logger))
            .layer(middleware::from_fn(request_id_middleware));

        let response = app.oneshot(request("/test")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_timeout_returns_gateway_timeout() {
        let app = Router::new().route("/slow", get(slow_handler)).layer(
            middleware::from_fn_with_state(Duration::from_millis(20), request_timeout),
        );

        let response = app.oneshot(request("/slow")).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "error": "request timed out" }));
    }

    #[tokio::test]
    async fn test_request_timeout_allows_fast_handlers() {
        let app = Router::new().route("/fast", get(|| async { "ok" })).layer(
            middleware::from_fn_with_state(Duration::from_secs(1), request_timeout),
        );

        let response = app.oneshot(request("/fast")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
