//! Admin API endpoints
//!
//! - GET /api/v1/admin/stats - Marketplace statistics and server counters
//! - GET|POST /api/v1/admin/users, PUT|DELETE /api/v1/admin/users/{id}
//! - GET|PUT /api/v1/admin/users/{id}/categories - Provider assignments
//!
//! Category, form field, moderation and landing page routes live next to
//! their public counterparts and are merged in by the API router.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::auth::UserResponse;
use crate::api::common::{default_admin_per_page, default_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{AssignmentEntry, ListParams, PagedResult, ServiceProviderCategory, UserRole, UserStatus};
use crate::services::{AdminUpdateUserInput, CreateUserInput, Dashboard};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the admin user and stats router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", axum::routing::put(update_user).delete(delete_user))
        .route(
            "/users/{id}/categories",
            get(get_user_categories).put(set_user_categories),
        )
}

// ============================================================================
// Stats
// ============================================================================

/// Process counters collected by the request stats middleware
#[derive(Debug, Serialize)]
pub struct ServerStats {
    pub version: String,
    pub uptime_seconds: u64,
    pub uptime_formatted: String,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    pub server: ServerStats,
}

/// GET /api/v1/admin/stats
async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let dashboard = state.dashboard_service.dashboard().await?;

    let uptime_seconds = state.request_stats.uptime_seconds();
    Ok(Json(StatsResponse {
        dashboard,
        server: ServerStats {
            version: APP_VERSION.to_string(),
            uptime_seconds,
            uptime_formatted: format_uptime(uptime_seconds),
            total_requests: state.request_stats.total_requests(),
            avg_response_time_ms: state.request_stats.avg_response_time_us() / 1000.0,
        },
    }))
}

/// Format uptime to human readable string
fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_admin_per_page")]
    pub per_page: u32,
    pub role: Option<String>,
}

/// GET /api/v1/admin/users
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<PagedResult<UserResponse>>, ApiError> {
    let role = query
        .role
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(|r| UserRole::from_str(r).map_err(|e| ApiError::validation_error(e.to_string())))
        .transpose()?;

    let users = state
        .user_service
        .list_users(role, &ListParams::new(query.page, query.per_page))
        .await?;
    Ok(Json(users.map(UserResponse::from)))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub business_name: Option<String>,
}

/// POST /api/v1/admin/users
async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateUserInput {
        display_name: body.display_name,
        phone: body.phone,
        business_name: body.business_name,
        ..CreateUserInput::new(body.username, body.email, body.password, body.role)
    };

    let user = state.user_service.create_user(input).await?;
    tracing::info!("{} created {} account {}", admin.username, user.role, user.username);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Option<UserRole>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub business_name: Option<String>,
}

/// PUT /api/v1/admin/users/{id}
///
/// Banning a user ends their sessions; admins cannot demote or ban themselves.
async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let status = body
        .status
        .as_deref()
        .map(|s| UserStatus::from_str(s).map_err(|e| ApiError::validation_error(e.to_string())))
        .transpose()?;

    let input = AdminUpdateUserInput {
        role: body.role,
        status,
        email: body.email,
        display_name: body.display_name,
        phone: body.phone,
        business_name: body.business_name,
    };

    let user = state.user_service.admin_update_user(&admin, id, input).await?;
    Ok(Json(user.into()))
}

/// DELETE /api/v1/admin/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete_user(&admin, id).await?;
    // A provider's destinations go with them, detaching landing cards
    state.landing_service.invalidate().await;
    tracing::info!("User {} deleted by {}", id, admin.username);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Provider assignments
// ============================================================================

/// GET /api/v1/admin/users/{id}/categories
async fn get_user_categories(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ServiceProviderCategory>>, ApiError> {
    Ok(Json(state.assignment_service.list_assignments(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SetCategoriesRequest {
    /// Full replacement; a missing subcategory grants the whole category
    pub assignments: Vec<AssignmentEntry>,
}

/// PUT /api/v1/admin/users/{id}/categories
async fn set_user_categories(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SetCategoriesRequest>,
) -> Result<Json<Vec<ServiceProviderCategory>>, ApiError> {
    Ok(Json(
        state
            .assignment_service
            .set_assignments(id, body.assignments)
            .await?,
    ))
}
