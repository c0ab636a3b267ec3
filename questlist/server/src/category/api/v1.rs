use crate::category::{Category, CategoryService, CategoryState};
use crate::web::api::{ApiError, Envelope, ErrorResponse, json_body, required_text};
use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryData {
    pub category: Category,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoriesData {
    pub categories: Vec<Category>,
}

fn category_not_found() -> ApiError {
    ApiError::NotFound("Category not found".to_string())
}

/// Handler for GET /api/categories - Returns all categories.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "All categories in the success envelope", body = CategoriesData)
    ),
    tag = "Categories"
)]
pub async fn get_categories_handler(
    State(state): State<CategoryState>,
) -> Json<Envelope<CategoriesData>> {
    let categories = CategoryService::new(&state.categories)
        .list_categories()
        .await;
    Json(Envelope::with_results(
        categories.len(),
        CategoriesData { categories },
    ))
}

/// Handler for GET /api/categories/{id} - Returns a single category.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = String, Path, description = "Category ID")),
    responses(
        (status = 200, description = "The category in the success envelope", body = CategoryData),
        (status = 400, description = "Malformed category ID", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "Categories"
)]
pub async fn get_category_handler(
    State(state): State<CategoryState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<CategoryData>>, ApiError> {
    CategoryService::new(&state.categories)
        .get_category_by_id(&id)
        .await?
        .map(|category| Json(Envelope::new(CategoryData { category })))
        .ok_or_else(category_not_found)
}

/// Handler for POST /api/categories - Creates a category from `name` and `color`.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    post,
    path = "/api/categories",
    responses(
        (status = 201, description = "The created category in the success envelope", body = CategoryData),
        (status = 400, description = "Invalid category data or duplicate name", body = ErrorResponse)
    ),
    tag = "Categories"
)]
pub async fn create_category_handler(
    State(state): State<CategoryState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<CategoryData>>), ApiError> {
    let payload = json_body(body)?;
    let name = required_text(&payload, "name", "Category name is required")?;
    let color = required_text(&payload, "color", "Category color is required")?;

    let category = CategoryService::new(&state.categories)
        .create_category(name, color)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::new(CategoryData { category })),
    ))
}

/// Handler for PUT /api/categories/{id} - Updates a category.
///
/// The body must carry both `name` and `color`.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = String, Path, description = "Category ID")),
    responses(
        (status = 200, description = "The updated category in the success envelope", body = CategoryData),
        (status = 400, description = "Invalid category data, ID or duplicate name", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "Categories"
)]
pub async fn update_category_handler(
    State(state): State<CategoryState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Envelope<CategoryData>>, ApiError> {
    let updates = json_body(body)?;

    CategoryService::new(&state.categories)
        .update_category(&id, updates)
        .await?
        .map(|category| Json(Envelope::new(CategoryData { category })))
        .ok_or_else(category_not_found)
}

/// Handler for DELETE /api/categories/{id} - Deletes a category.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = String, Path, description = "Category ID")),
    responses(
        (status = 200, description = "The category was deleted; data is null"),
        (status = 400, description = "Malformed category ID", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "Categories"
)]
pub async fn delete_category_handler(
    State(state): State<CategoryState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, ApiError> {
    CategoryService::new(&state.categories)
        .delete_category(&id)
        .await?
        .map(|_| Json(Envelope::new(())))
        .ok_or_else(category_not_found)
}

/// Creates and returns the categories API router.
pub fn create_api_router(state: CategoryState) -> Router {
    Router::new()
        .route(
            "/categories",
            get(get_categories_handler).post(create_category_handler),
        )
        .route(
            "/categories/{id}",
            get(get_category_handler)
                .put(update_category_handler)
                .delete(delete_category_handler),
        )
        .with_state(state)
}
