#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use questlist_server::category::CategoryState;
use questlist_server::config::Config;
use questlist_server::task::TaskState;
use questlist_server::validation::Payload;
use questlist_server::web::create_app;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Test context holding the shared stores behind the router.
pub struct TestContext {
    pub tasks: TaskState,
    pub categories: CategoryState,
    pub app: Router,
}

pub fn setup() -> TestContext {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let tasks = TaskState::default();
    let categories = CategoryState::default();
    let app = create_app(
        Arc::new(Config::default()),
        tasks.clone(),
        categories.clone(),
    )
    .expect("Failed to create app");
    TestContext {
        tasks,
        categories,
        app,
    }
}

pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Sends a request through a clone of the router.
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Status code and decoded body, for snapshot assertions.
#[derive(Debug, Serialize)]
pub struct ResponseSnapshot<T> {
    pub status: u16,
    pub body: T,
}

impl<T: DeserializeOwned> ResponseSnapshot<T> {
    pub async fn capture(response: Response<Body>) -> Self {
        let status: StatusCode = response.status();
        Self {
            status: status.as_u16(),
            body: body_json(response).await,
        }
    }
}
