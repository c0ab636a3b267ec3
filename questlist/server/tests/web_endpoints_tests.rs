use axum::http::StatusCode;
use questlist_server::web::api::{ErrorResponse, StatusResponse};
use serde_json::Value;

mod common;

use common::{body_json, get, send};

#[tokio::test]
async fn can_report_api_status() {
    let context = common::setup();

    let response = send(&context.app, get("/api/status")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: StatusResponse = body_json(response).await;
    assert_eq!(body.status, "success");
    assert_eq!(body.message, "API is running");
    assert_eq!(body.environment, "development");
}

#[tokio::test]
async fn can_return_not_found_for_unknown_route() {
    let context = common::setup();

    let response = send(&context.app, get("/api/unknown")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: ErrorResponse = body_json(response).await;
    assert_eq!(body.status, "fail");
    assert_eq!(body.message, "Can't find /api/unknown on this server");
}

#[tokio::test]
async fn can_serve_openapi_document() {
    let context = common::setup();

    let response = send(&context.app, get("/api-docs/openapi.json")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = body_json(response).await;
    let paths = body["paths"].as_object().expect("paths object");
    for path in [
        "/api/status",
        "/api/tasks",
        "/api/tasks/stats",
        "/api/tasks/{id}",
        "/api/tasks/bulk-update",
        "/api/categories",
        "/api/categories/{id}",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
}

#[tokio::test]
async fn can_add_security_headers() {
    let context = common::setup();

    let response = send(&context.app, get("/api/categories")).await;

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["referrer-policy"], "no-referrer");
}
