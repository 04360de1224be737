//! Landing page endpoints
//!
//! - GET /api/v1/landing - Public home page configuration
//! - PUT /api/v1/admin/landing - Replace it (admin)

use axum::{extract::State, routing::get, routing::put, Json, Router};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::LandingPageConfig;
use crate::services::LandingInput;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_landing))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/landing", put(update_landing))
}

/// GET /api/v1/landing
async fn get_landing(State(state): State<AppState>) -> Result<Json<LandingPageConfig>, ApiError> {
    Ok(Json(state.landing_service.get().await?))
}

/// PUT /api/v1/admin/landing
async fn update_landing(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Json(input): Json<LandingInput>,
) -> Result<Json<LandingPageConfig>, ApiError> {
    Ok(Json(state.landing_service.update(&admin, input).await?))
}
