#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode},
};
use serde_json::{Value, json};
use subscription_service::{Server, test_utils::TestServerBuilder};
use tower::ServiceExt;

/// Full application on a migrated in-memory database
pub struct TestHarness {
    pub server: Server,
    pub app: Router,
}

impl TestHarness {
    pub async fn new() -> Self {
        let server = TestServerBuilder::new().build().await;
        let app = server.create_app();
        Self { server, app }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Send a request and decode the JSON body
    pub async fn request_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Create a subscription and return its id
    pub async fn create(&self, body: Value) -> String {
        let (status, created) = self
            .request_json(Method::POST, "/subscriptions/", Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        created["id"].as_str().unwrap().to_string()
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn subscription(
    service_name: &str,
    price: i64,
    user_id: &str,
    start_date: &str,
    end_date: Option<&str>,
) -> Value {
    let mut body = json!({
        "service_name": service_name,
        "price": price,
        "user_id": user_id,
        "start_date": start_date,
    });
    if let Some(end_date) = end_date {
        body["end_date"] = json!(end_date);
    }
    body
}
