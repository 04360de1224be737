//! Category API endpoints
//!
//! Public:
//! - GET /api/v1/categories - Catalog with subcategories
//! - GET /api/v1/categories/{key} - One category by id or slug
//! - GET /api/v1/categories/{key}/form - Dynamic form of a category
//!
//! Admin (mounted under /api/v1/admin):
//! - POST /categories, PUT|DELETE /categories/{id}
//! - GET|POST /categories/{id}/subcategories, PUT|DELETE /subcategories/{id}
//! - GET|POST /categories/{id}/fields, PUT /categories/{id}/fields/order
//! - PUT|DELETE /fields/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Category, CategoryWithSubcategories, FormField, Subcategory};
use crate::services::{CategoryForm, CreateCategoryInput, CreateFieldInput, UpdateCategoryInput, UpdateFieldInput};

/// Build the public category router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{key}", get(get_category))
        .route("/{key}/form", get(get_category_form))
}

/// Build the admin category router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/categories", post(create_category))
        .route("/categories/{id}", put(update_category).delete(delete_category))
        .route(
            "/categories/{id}/subcategories",
            get(list_subcategories).post(create_subcategory),
        )
        .route(
            "/subcategories/{id}",
            put(update_subcategory).delete(delete_subcategory),
        )
        .route("/categories/{id}/fields", get(list_fields).post(create_field))
        .route("/categories/{id}/fields/order", put(reorder_fields))
        .route("/fields/{id}", put(update_field).delete(delete_field))
}

// ============================================================================
// Public
// ============================================================================

/// GET /api/v1/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithSubcategories>>, ApiError> {
    Ok(Json(state.category_service.catalog().await?))
}

/// GET /api/v1/categories/{key}
async fn get_category(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CategoryWithSubcategories>, ApiError> {
    Ok(Json(state.category_service.resolve(&key).await?))
}

/// GET /api/v1/categories/{key}/form
///
/// Fields in order plus the row layout used to render them.
async fn get_category_form(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CategoryForm>, ApiError> {
    let category = state.category_service.resolve(&key).await?;
    Ok(Json(state.form_service.form(category.category.id).await?))
}

// ============================================================================
// Admin: categories
// ============================================================================

/// POST /api/v1/admin/categories
async fn create_category(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Json(input): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.category_service.create(input).await?;
    tracing::info!("Category '{}' created by {}", category.slug, admin.username);
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/v1/admin/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.update(id, input).await?))
}

/// DELETE /api/v1/admin/categories/{id}
///
/// Refused with 409 while destinations still use the category.
async fn delete_category(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    tracing::info!("Category {} deleted by {}", id, admin.username);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Admin: subcategories
// ============================================================================

/// GET /api/v1/admin/categories/{id}/subcategories
async fn list_subcategories(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Subcategory>>, ApiError> {
    state.category_service.require(id).await?;
    Ok(Json(state.category_service.list_subcategories(id).await?))
}

/// POST /api/v1/admin/categories/{id}/subcategories
async fn create_subcategory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let subcategory = state.category_service.create_subcategory(id, input).await?;
    Ok((StatusCode::CREATED, Json(subcategory)))
}

/// PUT /api/v1/admin/subcategories/{id}
async fn update_subcategory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<Subcategory>, ApiError> {
    Ok(Json(state.category_service.update_subcategory(id, input).await?))
}

/// DELETE /api/v1/admin/subcategories/{id}
async fn delete_subcategory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete_subcategory(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Admin: form fields
// ============================================================================

/// GET /api/v1/admin/categories/{id}/fields
async fn list_fields(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FormField>>, ApiError> {
    state.category_service.require(id).await?;
    Ok(Json(state.form_service.list_fields(id).await?))
}

/// POST /api/v1/admin/categories/{id}/fields
async fn create_field(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CreateFieldInput>,
) -> Result<impl IntoResponse, ApiError> {
    let field = state.form_service.create_field(id, input).await?;
    Ok((StatusCode::CREATED, Json(field)))
}

#[derive(Debug, Deserialize)]
pub struct ReorderFieldsRequest {
    /// Every field id of the category, in the new order
    pub ids: Vec<i64>,
}

/// PUT /api/v1/admin/categories/{id}/fields/order
async fn reorder_fields(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ReorderFieldsRequest>,
) -> Result<Json<Vec<FormField>>, ApiError> {
    Ok(Json(state.form_service.reorder_fields(id, body.ids).await?))
}

/// PUT /api/v1/admin/fields/{id}
async fn update_field(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateFieldInput>,
) -> Result<Json<FormField>, ApiError> {
    Ok(Json(state.form_service.update_field(id, input).await?))
}

/// DELETE /api/v1/admin/fields/{id}
async fn delete_field(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.form_service.delete_field(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
