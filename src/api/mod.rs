//! API layer - HTTP handlers and routing
//!
//! Everything lives under `/api/v1`:
//! - Auth endpoints
//! - Category catalog and dynamic forms
//! - Destinations, comments, likes and views
//! - Landing page
//! - Service provider area
//! - Admin area
//! - Uploads
//!
//! Uploaded files are served from `/uploads`.

pub mod admin;
pub mod auth;
pub mod categories;
pub mod common;
pub mod destinations;
pub mod engagement;
pub mod landing;
pub mod middleware;
pub mod upload;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxAssignmentRepository, SqlxCategoryRepository, SqlxDestinationRepository,
    SqlxEngagementRepository, SqlxFormFieldRepository, SqlxLandingRepository,
    SqlxSessionRepository, SqlxStatsRepository, SqlxSubcategoryRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    AssignmentService, CategoryService, DashboardService, DestinationService, EngagementService,
    FormService, LandingService, LoginRateLimiter, UserService,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser, RequestStats};

/// Wire repositories and services into the shared state
pub fn create_state(pool: DynDatabasePool, cache: Arc<Cache>, config: &Config) -> AppState {
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let subcategory_repo = SqlxSubcategoryRepository::boxed(pool.clone());
    let destination_repo = SqlxDestinationRepository::boxed(pool.clone());
    let cache_ttl = Duration::from_secs(config.cache.ttl_seconds);

    let user_service = Arc::new(UserService::with_session_expiration(
        user_repo.clone(),
        SqlxSessionRepository::boxed(pool.clone()),
        config.auth.session_days,
    ));
    let category_service = Arc::new(CategoryService::with_cache_ttl(
        category_repo.clone(),
        subcategory_repo.clone(),
        cache.clone(),
        cache_ttl,
    ));
    let assignment_service = Arc::new(AssignmentService::new(
        SqlxAssignmentRepository::boxed(pool.clone()),
        user_repo.clone(),
        category_repo.clone(),
        subcategory_repo.clone(),
    ));
    let form_service = Arc::new(FormService::with_cache_ttl(
        SqlxFormFieldRepository::boxed(pool.clone()),
        category_repo.clone(),
        cache.clone(),
        cache_ttl,
    ));
    let destination_service = Arc::new(DestinationService::new(
        destination_repo.clone(),
        category_repo,
        subcategory_repo,
        user_repo,
        assignment_service.clone(),
        form_service.clone(),
        cache.clone(),
    ));
    let engagement_service = Arc::new(EngagementService::new(
        SqlxEngagementRepository::boxed(pool.clone()),
        destination_service.clone(),
    ));
    let landing_service = Arc::new(LandingService::with_cache_ttl(
        SqlxLandingRepository::boxed(pool.clone()),
        destination_repo,
        cache,
        cache_ttl,
    ));
    let dashboard_service = Arc::new(DashboardService::new(SqlxStatsRepository::boxed(pool.clone())));

    AppState {
        pool,
        user_service,
        category_service,
        assignment_service,
        form_service,
        destination_service,
        engagement_service,
        landing_service,
        dashboard_service,
        rate_limiter: Arc::new(LoginRateLimiter::from_config(&config.auth)),
        upload_config: Arc::new(config.upload.clone()),
        request_stats: Arc::new(RequestStats::new()),
    }
}

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .merge(admin::router())
        .merge(categories::admin_router())
        .merge(destinations::admin_router())
        .merge(landing::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Service provider routes (admins pass too)
    let provider_routes = Router::new()
        .nest("/provider", destinations::provider_router())
        .nest(
            "/upload",
            upload::router().layer(DefaultBodyLimit::max(state.upload_config.body_limit())),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_provider))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth, any role)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .merge(engagement::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes; a session, when present, is attached for visibility
    // checks and for handlers that require a user
    let public_routes = Router::new()
        .nest("/auth", auth::public_router())
        .nest("/categories", categories::router())
        .nest(
            "/destinations",
            destinations::router().merge(engagement::destination_router()),
        )
        .nest("/landing", landing::router())
        .route("/health", get(health))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    Router::new()
        .nest("/admin", admin_routes)
        .merge(provider_routes)
        .merge(protected_routes)
        .merge(public_routes)
}

/// GET /api/v1/health
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "database": "ok" })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "error", "database": "unreachable" })),
            )
        }
    }
}

/// Build the complete router with middleware
///
/// `cors_origin` is the single browser origin allowed to send the session
/// cookie; `*` allows any origin without credentials.
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let cors = if cors_origin.trim() == "*" {
        CorsLayer::permissive()
    } else {
        let origin = cors_origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true)
    };

    let uploads = ServeDir::new(&state.upload_config.path);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service("/uploads", uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
        // Request stats (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state))
}
