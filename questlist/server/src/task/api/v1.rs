use crate::error::ServiceError;
use crate::task::{
    SortField, SortOrder, Task, TaskFilters, TaskService, TaskState, TaskStats, parse_due_date,
};
use crate::validation::{FieldType, Payload, parse_id};
use crate::web::api::{
    ApiError, Envelope, ErrorResponse, json_body, optional_text, required_text, wrong_type,
};
use axum::{
    Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

/// Body fields forwarded to the service as task extras.
const TASK_EXTRAS: [&str; 4] = ["priority", "categoryId", "dueDate", "tags"];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskData {
    pub task: Task,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TasksData {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsData {
    pub stats: TaskStats,
}

/// Query parameters for listing tasks.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TasksQuery {
    /// "true" selects completed tasks, any other value pending ones
    completed: Option<String>,
    /// baixa, média or alta
    priority: Option<String>,
    category_id: Option<String>,
    /// Case-insensitive text searched in title and description
    search: Option<String>,
    /// Only tasks due on or before this date
    due_before: Option<String>,
    /// Only tasks due on or after this date
    due_after: Option<String>,
    /// Task field to sort by, e.g. dueDate
    sort_by: Option<String>,
    /// asc (default) or desc
    sort_order: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn date_bound(raw: Option<String>, parameter: &str) -> Result<Option<DateTime<Utc>>, ServiceError> {
    non_empty(raw)
        .map(|raw| {
            parse_due_date(&raw).ok_or_else(|| {
                ServiceError::Validation(format!("{parameter} must be an ISO 8601 date"))
            })
        })
        .transpose()
}

impl TryFrom<TasksQuery> for TaskFilters {
    type Error = ServiceError;

    fn try_from(query: TasksQuery) -> Result<Self, Self::Error> {
        let category_id = non_empty(query.category_id)
            .map(|raw| {
                parse_id(&raw).ok_or_else(|| {
                    ServiceError::Validation("categoryId must be a number".to_string())
                })
            })
            .transpose()?;

        Ok(TaskFilters {
            completed: query.completed.map(|completed| completed == "true"),
            priority: non_empty(query.priority),
            category_id,
            search: non_empty(query.search),
            due_before: date_bound(query.due_before, "dueBefore")?,
            due_after: date_bound(query.due_after, "dueAfter")?,
            sort_by: non_empty(query.sort_by).and_then(|field| SortField::parse(&field)),
            sort_order: query
                .sort_order
                .map(|order| SortOrder::parse(&order))
                .unwrap_or_default(),
        })
    }
}

/// Handler for GET /api/tasks - Lists tasks matching the query filters.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TasksQuery),
    responses(
        (status = 200, description = "Matching tasks in the success envelope", body = TasksData),
        (status = 400, description = "Malformed filter value", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_tasks_handler(
    State(state): State<TaskState>,
    Query(query): Query<TasksQuery>,
) -> Result<Json<Envelope<TasksData>>, ApiError> {
    let filters = TaskFilters::try_from(query)?;
    let tasks = TaskService::new(&state.tasks).list_tasks(&filters).await;

    Ok(Json(Envelope::with_results(tasks.len(), TasksData { tasks })))
}

/// Handler for GET /api/tasks/stats - Returns task statistics.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/stats",
    responses(
        (status = 200, description = "Task statistics in the success envelope", body = StatsData)
    ),
    tag = "Tasks"
)]
pub async fn get_task_stats_handler(State(state): State<TaskState>) -> Json<Envelope<StatsData>> {
    let stats = TaskService::new(&state.tasks).task_stats().await;
    Json(Envelope::new(StatsData { stats }))
}

/// Handler for GET /api/tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "The task in the success envelope", body = TaskData),
        (status = 400, description = "Malformed task ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<TaskState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<TaskData>>, ApiError> {
    TaskService::new(&state.tasks)
        .get_task_by_id(&id)
        .await?
        .map(|task| Json(Envelope::new(TaskData { task })))
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// Handler for POST /api/tasks - Creates a task.
///
/// Reads `title` and `description`; `priority`, `categoryId`, `dueDate` and
/// `tags` are passed on as extras. Other body fields are ignored.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    post,
    path = "/api/tasks",
    responses(
        (status = 201, description = "The created task in the success envelope", body = TaskData),
        (status = 400, description = "Invalid task data", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<TaskState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<TaskData>>), ApiError> {
    let payload = json_body(body)?;
    let title = required_text(&payload, "title", "Title is required")?;
    let description = optional_text(&payload, "description")?;
    let extra: Payload = TASK_EXTRAS
        .iter()
        .filter_map(|field| {
            payload
                .get(*field)
                .map(|value| (field.to_string(), value.clone()))
        })
        .collect();

    let task = TaskService::new(&state.tasks)
        .create_task(title, description, extra)
        .await?;

    Ok((StatusCode::CREATED, Json(Envelope::new(TaskData { task }))))
}

/// Handler for PUT /api/tasks/{id} - Updates a task.
///
/// The body is validated as a whole task, so it must include the title.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "The updated task in the success envelope", body = TaskData),
        (status = 400, description = "Invalid task data or ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<TaskState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Envelope<TaskData>>, ApiError> {
    let updates = json_body(body)?;

    TaskService::new(&state.tasks)
        .update_task(&id, updates)
        .await?
        .map(|task| Json(Envelope::new(TaskData { task })))
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// Handler for DELETE /api/tasks/{id} - Deletes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "The task was deleted; data is null"),
        (status = 400, description = "Malformed task ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<TaskState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, ApiError> {
    TaskService::new(&state.tasks)
        .delete_task(&id)
        .await?
        .map(|_| Json(Envelope::new(())))
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// Handler for POST /api/tasks/bulk-update - Marks several tasks as completed or pending.
///
/// Expects `{"ids": [...], "completed": bool}` with a non-empty `ids` array.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    post,
    path = "/api/tasks/bulk-update",
    responses(
        (status = 200, description = "The updated tasks in the success envelope", body = TasksData),
        (status = 400, description = "Missing IDs or completion status", body = ErrorResponse),
        (status = 404, description = "Some IDs match no task; the others were still updated", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn bulk_update_status_handler(
    State(state): State<TaskState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Envelope<TasksData>>, ApiError> {
    let payload = json_body(body)?;
    let ids = match payload.get("ids") {
        Some(Value::Array(ids)) if !ids.is_empty() => ids,
        _ => {
            return Err(ApiError::BadRequest(
                "An array of task IDs is required".to_string(),
            ));
        }
    };
    let completed = match payload.get("completed") {
        None => {
            return Err(ApiError::BadRequest(
                "The completion status (completed) is required".to_string(),
            ));
        }
        Some(Value::Bool(completed)) => *completed,
        Some(_) => return Err(wrong_type("completed", FieldType::Boolean)),
    };

    let tasks = TaskService::new(&state.tasks)
        .bulk_update_status(ids, completed)
        .await?;

    Ok(Json(Envelope::with_results(tasks.len(), TasksData { tasks })))
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: TaskState) -> Router {
    Router::new()
        .route("/tasks", get(get_tasks_handler).post(create_task_handler))
        .route("/tasks/stats", get(get_task_stats_handler))
        .route("/tasks/bulk-update", post(bulk_update_status_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}
