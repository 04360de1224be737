//! Destination API endpoints
//!
//! Public:
//! - GET /api/v1/destinations - Approved destinations with filters
//! - GET /api/v1/destinations/{key} - Destination page by id or slug
//!
//! Service provider (mounted under /api/v1/provider):
//! - GET /categories - Categories the caller may publish under
//! - GET|POST /destinations, PUT|DELETE /destinations/{id}
//!
//! Admin (mounted under /api/v1/admin):
//! - GET /destinations - Moderation queue, any status
//! - POST /destinations/{id}/approve, POST /destinations/{id}/reject
//! - DELETE /destinations/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;

use crate::api::common::{default_admin_per_page, default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{
    Destination, DestinationDetail, DestinationFilter, DestinationSort, DestinationStatus,
    ListParams, PagedResult, ProviderCategory,
};
use crate::services::DestinationInput;

/// Listing filters shared by the public, provider and admin listings
#[derive(Debug, Deserialize)]
pub struct DestinationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Category id or slug
    pub category: Option<String>,
    pub subcategory_id: Option<i64>,
    /// Free text search
    pub q: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// newest, popular, price_asc or price_desc
    pub sort: Option<String>,
    /// Ignored by the public listing
    pub status: Option<String>,
}

impl DestinationQuery {
    fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }

    fn status(&self) -> Result<Option<DestinationStatus>, ApiError> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| DestinationStatus::from_str(s).map_err(|e| ApiError::validation_error(e.to_string())))
            .transpose()
    }

    async fn filter(&self, state: &AppState) -> Result<DestinationFilter, ApiError> {
        let category_id = match self.category.as_deref().filter(|c| !c.is_empty()) {
            Some(key) => Some(state.category_service.resolve(key).await?.category.id),
            None => None,
        };

        let sort = match self.sort.as_deref().filter(|s| !s.is_empty()) {
            Some(sort) => {
                DestinationSort::from_str(sort).map_err(|e| ApiError::validation_error(e.to_string()))?
            }
            None => DestinationSort::default(),
        };

        Ok(DestinationFilter {
            status: self.status()?,
            category_id,
            subcategory_id: self.subcategory_id,
            creator_id: None,
            query: self
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(String::from),
            min_price: self.min_price,
            max_price: self.max_price,
            sort,
        })
    }
}

/// Build the public destination router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_destinations))
        .route("/{key}", get(get_destination))
}

/// Build the provider router
pub fn provider_router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(provider_categories))
        .route("/destinations", get(list_own_destinations).post(create_destination))
        .route(
            "/destinations/{id}",
            put(update_destination).delete(delete_destination),
        )
}

/// Build the admin moderation router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/destinations", get(admin_list_destinations))
        .route("/destinations/{id}", axum::routing::delete(delete_destination))
        .route("/destinations/{id}/approve", post(approve_destination))
        .route("/destinations/{id}/reject", post(reject_destination))
}

// ============================================================================
// Public
// ============================================================================

/// GET /api/v1/destinations
async fn list_destinations(
    State(state): State<AppState>,
    Query(query): Query<DestinationQuery>,
) -> Result<Json<PagedResult<Destination>>, ApiError> {
    let filter = query.filter(&state).await?;
    let result = state
        .destination_service
        .list_public(filter, &query.params())
        .await?;
    Ok(Json(result))
}

/// GET /api/v1/destinations/{key}
///
/// Pending and rejected destinations are only visible to their owner and admins.
async fn get_destination(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(key): Path<String>,
) -> Result<Json<DestinationDetail>, ApiError> {
    let detail = state.destination_service.detail(&key, viewer.as_ref()).await?;
    Ok(Json(detail))
}

// ============================================================================
// Provider
// ============================================================================

/// GET /api/v1/provider/categories
///
/// Admins may publish anywhere and get the whole catalog.
async fn provider_categories(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<ProviderCategory>>, ApiError> {
    if user.is_admin() {
        let catalog = state.category_service.catalog().await?;
        let categories = catalog
            .into_iter()
            .map(|entry| ProviderCategory {
                category: entry.category,
                whole_category: true,
                subcategories: entry.subcategories,
            })
            .collect();
        return Ok(Json(categories));
    }

    Ok(Json(state.assignment_service.provider_categories(user.id).await?))
}

#[derive(Debug, Deserialize)]
pub struct OwnDestinationsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_admin_per_page")]
    pub per_page: u32,
    pub status: Option<String>,
}

/// GET /api/v1/provider/destinations
async fn list_own_destinations(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<OwnDestinationsQuery>,
) -> Result<Json<PagedResult<Destination>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| DestinationStatus::from_str(s).map_err(|e| ApiError::validation_error(e.to_string())))
        .transpose()?;

    let result = state
        .destination_service
        .list_own(&user, status, &ListParams::new(query.page, query.per_page))
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/provider/destinations
///
/// Provider submissions start as pending.
async fn create_destination(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(input): Json<DestinationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let destination = state.destination_service.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(destination)))
}

/// PUT /api/v1/provider/destinations/{id}
async fn update_destination(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<DestinationInput>,
) -> Result<Json<Destination>, ApiError> {
    Ok(Json(state.destination_service.update(&user, id, input).await?))
}

/// DELETE /api/v1/provider/destinations/{id}, DELETE /api/v1/admin/destinations/{id}
async fn delete_destination(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.destination_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Admin
// ============================================================================

/// GET /api/v1/admin/destinations
async fn admin_list_destinations(
    State(state): State<AppState>,
    Query(query): Query<DestinationQuery>,
) -> Result<Json<PagedResult<Destination>>, ApiError> {
    let filter = query.filter(&state).await?;
    Ok(Json(state.destination_service.list(&filter, &query.params()).await?))
}

/// POST /api/v1/admin/destinations/{id}/approve
async fn approve_destination(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Destination>, ApiError> {
    Ok(Json(state.destination_service.approve(&admin, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// POST /api/v1/admin/destinations/{id}/reject
async fn reject_destination(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<Destination>, ApiError> {
    Ok(Json(
        state.destination_service.reject(&admin, id, &body.reason).await?,
    ))
}
