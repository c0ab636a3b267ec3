use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{OriginalUri, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{OpenApi, ToSchema};

use crate::category::{Category, CategoryState};
use crate::config::Config;
use crate::error::ServiceError;
use crate::task::{PriorityBreakdown, Priority, Task, TaskState, TaskStats};
use crate::validation::{FieldType, Payload, Violation};

/// Success envelope wrapping every JSON response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    /// Number of records in `data`, present on list responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success".to_string(),
            results: None,
            data,
        }
    }

    pub fn with_results(results: usize, data: T) -> Self {
        Self {
            results: Some(results),
            ..Self::new(data)
        }
    }
}

/// JSON response for API errors
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// "fail" for client errors, "error" for server errors
    pub status: String,
    pub message: String,
}

/// Error type for API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An error raised by a service.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// A record addressed by the request path does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The request was rejected before reaching a service.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::Validation(_))
            | ApiError::Service(ServiceError::Conflict(_))
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::NotFound(_)) | ApiError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let status = if status_code.is_client_error() {
            "fail"
        } else {
            "error"
        };
        tracing::warn!(status = status_code.as_u16(), "Request failed: {}", self);

        (
            status_code,
            Json(ErrorResponse {
                status: status.to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

/// Unwraps a JSON object body, rejecting malformed JSON and non-object bodies.
pub fn json_body(body: Result<axum::Json<Value>, JsonRejection>) -> Result<Payload, ApiError> {
    match body? {
        Json(Value::Object(payload)) => Ok(payload),
        Json(_) => Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

/// Reads a string field that must be present and non-empty.
///
/// Missing, `null`, `false`, `0` and `""` are reported with `missing_message`;
/// other non-string values fail type validation.
pub fn required_text(
    payload: &Payload,
    field: &'static str,
    missing_message: &str,
) -> Result<String, ApiError> {
    match payload.get(field) {
        Some(Value::String(text)) if !text.is_empty() => Ok(text.clone()),
        None | Some(Value::Null) | Some(Value::Bool(false)) | Some(Value::String(_)) => {
            Err(ApiError::BadRequest(missing_message.to_string()))
        }
        Some(Value::Number(number)) if number.as_f64() == Some(0.0) => {
            Err(ApiError::BadRequest(missing_message.to_string()))
        }
        Some(_) => Err(wrong_type(field, FieldType::String)),
    }
}

/// Reads an optional string field. `null` counts as absent.
pub fn optional_text(payload: &Payload, field: &'static str) -> Result<Option<String>, ApiError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(wrong_type(field, FieldType::String)),
    }
}

pub fn wrong_type(field: &'static str, expected: FieldType) -> ApiError {
    ServiceError::Validation(Violation::WrongType { field, expected }.to_string()).into()
}

/// JSON response for GET /api/status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

/// Handler for GET /api/status - Reports that the API is up.
#[tracing::instrument(skip(config))]
#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "The API is running", body = StatusResponse)
    ),
    tag = "Status"
)]
pub async fn status_handler(State(config): State<Arc<Config>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "success".to_string(),
        message: "API is running".to_string(),
        timestamp: Utc::now(),
        environment: config.environment.clone(),
    })
}

/// Fallback for routes that do not exist.
#[tracing::instrument]
pub async fn not_found_handler(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(format!("Can't find {} on this server", uri.path()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        status_handler,
        crate::task::api::v1::get_tasks_handler,
        crate::task::api::v1::get_task_stats_handler,
        crate::task::api::v1::get_task_handler,
        crate::task::api::v1::create_task_handler,
        crate::task::api::v1::update_task_handler,
        crate::task::api::v1::delete_task_handler,
        crate::task::api::v1::bulk_update_status_handler,
        crate::category::api::v1::get_categories_handler,
        crate::category::api::v1::get_category_handler,
        crate::category::api::v1::create_category_handler,
        crate::category::api::v1::update_category_handler,
        crate::category::api::v1::delete_category_handler,
    ),
    components(schemas(
        Task,
        Priority,
        TaskStats,
        PriorityBreakdown,
        Category,
        ErrorResponse,
        StatusResponse
    )),
    tags(
        (name = "Tasks", description = "Task management"),
        (name = "Categories", description = "Task categories"),
        (name = "Status", description = "Service status")
    )
)]
pub struct ApiDoc;

/// Handler for GET /api-docs/openapi.json
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Creates the JSON API routes under `/api`.
pub fn create_api_router(
    config: Arc<Config>,
    task_state: TaskState,
    category_state: CategoryState,
) -> Router {
    let status_router = Router::new()
        .route("/status", get(status_handler))
        .with_state(config);
    let api_routes = status_router
        .merge(crate::task::api::v1::create_api_router(task_state))
        .merge(crate::category::api::v1::create_api_router(category_state));

    Router::new()
        .nest("/api", api_routes)
        .route("/api-docs/openapi.json", get(openapi_handler))
        .fallback(not_found_handler)
}
