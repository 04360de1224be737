//! Comments, likes and views
//!
//! - GET /api/v1/destinations/{key}/comments - Public, newest first
//! - POST /api/v1/destinations/{key}/comments - Authenticated
//! - GET|POST /api/v1/destinations/{key}/like - Like status / toggle
//! - POST /api/v1/destinations/{key}/view - Record a view
//! - DELETE /api/v1/comments/{id} - Author or admin

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{extract_ip_address, user_agent, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{CommentWithAuthor, LikeStatus, PagedResult, Viewer};

/// Routes nested under /destinations; the session is optional at the layer
/// and required per handler
pub fn destination_router() -> Router<AppState> {
    Router::new()
        .route("/{key}/comments", get(list_comments).post(create_comment))
        .route("/{key}/like", get(like_status).post(toggle_like))
        .route("/{key}/view", post(record_view))
}

/// Routes behind the authentication layer
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/comments/{id}", delete(delete_comment))
}

/// GET /api/v1/destinations/{key}/comments
async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(key): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<CommentWithAuthor>>, ApiError> {
    let comments = state
        .engagement_service
        .list_comments(&key, viewer.as_ref(), &query.params())
        .await?;
    Ok(Json(comments))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// POST /api/v1/destinations/{key}/comments
async fn create_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(key): Path<String>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .engagement_service
        .add_comment(&user, &key, &body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /api/v1/comments/{id}
async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.engagement_service.delete_comment(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/destinations/{key}/like
async fn like_status(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(key): Path<String>,
) -> Result<Json<LikeStatus>, ApiError> {
    Ok(Json(state.engagement_service.like_status(&user, &key).await?))
}

/// POST /api/v1/destinations/{key}/like
async fn toggle_like(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(key): Path<String>,
) -> Result<Json<LikeStatus>, ApiError> {
    Ok(Json(state.engagement_service.toggle_like(&user, &key).await?))
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    /// False when the view was a repeat inside the window
    pub counted: bool,
}

/// POST /api/v1/destinations/{key}/view
///
/// Anonymous visitors are told apart by IP and User-Agent.
async fn record_view(
    State(state): State<AppState>,
    viewer: MaybeUser,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<ViewResponse>, ApiError> {
    let ip = extract_ip_address(&headers).unwrap_or_default();
    let identity = Viewer::identify(viewer.as_ref().map(|u| u.id), &ip, user_agent(&headers));

    let counted = state
        .engagement_service
        .record_view(&key, viewer.as_ref(), &identity)
        .await?;
    Ok(Json(ViewResponse { counted }))
}
