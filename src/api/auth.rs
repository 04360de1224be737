//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Registration, signs the new account in
//! - POST /api/v1/auth/login - Login by username or email
//! - POST /api/v1/auth/logout - Logout
//! - GET /api/v1/auth/me - Current user
//! - PUT /api/v1/auth/profile - Profile update
//! - PUT /api/v1/auth/password - Password change

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{clear_session_cookie, client_ip, session_cookie};
use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::models::{Session, User};
use crate::services::{LoginInput, ProfileInput, RegisterInput, UserServiceError};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub business_name: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
            status: user.status.to_string(),
            display_name: user.display_name,
            phone: user.phone,
            business_name: user.business_name,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
        .route("/profile", put(update_profile))
        .route("/password", put(change_password))
}

/// Session cookie plus the token in the body
fn session_response(
    state: &AppState,
    session: Session,
    user: User,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let cookie = session_cookie(&session.id, state.user_service.session_max_age())
        .ok_or_else(|| ApiError::internal_error("Failed to build session cookie"))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, cookie);

    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/register
///
/// The first account of an empty marketplace becomes the admin.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut input = RegisterInput::new(body.username, body.email, body.password.clone());
    if let Some(display_name) = body.display_name {
        input = input.with_display_name(display_name);
    }

    let user = state.user_service.register(input).await?;
    let (session, user) = state
        .user_service
        .login(LoginInput::new(user.username, body.password))
        .await?;

    let (headers, body) = session_response(&state, session, user)?;
    Ok((StatusCode::CREATED, headers, body))
}

/// POST /api/v1/auth/login
///
/// Guarded by a per-IP request window and a per-username failure window.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(ip) = client_ip(&headers) {
        if state.rate_limiter.is_ip_limited(ip).await {
            tracing::warn!("Login rate limit hit for IP {}", ip);
            return Err(ApiError::rate_limited("Too many requests, please try again later"));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    let attempt_key = state.user_service.login_attempt_key(&body.username_or_email).await?;
    if state.rate_limiter.is_username_limited(&attempt_key).await {
        tracing::warn!("Login rate limit hit for {}", body.username_or_email);
        return Err(ApiError::rate_limited(
            "Too many failed login attempts, please try again later",
        ));
    }

    let input = LoginInput::new(body.username_or_email.clone(), body.password);
    let (session, user) = match state.user_service.login(input).await {
        Ok(result) => result,
        Err(e) => {
            if matches!(e, UserServiceError::AuthenticationError(_) | UserServiceError::Banned) {
                tracing::warn!("Rejected login for {}: {}", body.username_or_email, e);
                state.rate_limiter.record_failed_attempt(&attempt_key).await;
            }
            return Err(e.into());
        }
    };

    state.rate_limiter.clear_username_attempts(&attempt_key).await;
    tracing::info!("User {} logged in", user.username);

    session_response(&state, session, user)
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&request) {
        state.user_service.logout(&token).await?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, clear_session_cookie());

    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/v1/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// Profile changes; an empty string clears an optional column
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub business_name: Option<String>,
}

/// PUT /api/v1/auth/profile
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let input = ProfileInput {
        email: body.email,
        display_name: body.display_name,
        phone: body.phone,
        business_name: body.business_name,
    };

    let updated = state.user_service.update_profile(user.0.id, input).await?;
    Ok(Json(updated.into()))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// PUT /api/v1/auth/password
async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .user_service
        .change_password(user.0.id, &body.current_password, &body.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
