//! User service
//!
//! Accounts, sessions and admin user management:
//! - registration (the first account becomes admin, everyone else `user`)
//! - login by username or email, logout, session validation
//! - profile and password changes
//! - admin listing, creation, role/status updates and deletion
//! - bootstrap admin creation at startup

use crate::config::AdminBootstrapConfig;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, Session, User, UserRole, UserStatus};
use crate::services::password::{check_password_policy, hash_password, verify_password};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

const USERNAME_MAX_LENGTH: usize = 50;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Account is banned
    #[error("Account is banned")]
    Banned,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    /// Action not allowed for the acting user
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Session lifetime in seconds, used for the cookie `Max-Age`
    pub fn session_max_age(&self) -> i64 {
        Duration::days(self.session_expiration_days).num_seconds()
    }

    /// Register a new account.
    ///
    /// The first account in an empty system becomes `admin`; every later
    /// self-registration gets the `user` role.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        check_password_policy(&input.password).map_err(UserServiceError::ValidationError)?;

        self.ensure_unique(&input.username, &input.email).await?;

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let mut user = User::new(input.username.trim().to_string(), input.email.trim().to_string(), password_hash, role);
        user.display_name = non_empty(input.display_name);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, role = %created.role, "User registered");
        Ok(created)
    }

    /// Check credentials and open a session
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .find_user_by_username_or_email(input.username_or_email.trim())
            .await?
            .ok_or_else(invalid)?;

        let password_valid =
            verify_password(&input.password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            return Err(invalid());
        }

        if user.is_banned() {
            return Err(UserServiceError::Banned);
        }

        let session = self.create_session(user.id).await?;
        Ok((session, user))
    }

    /// Invalidate a session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// User behind a session token, `None` when unknown, expired or banned
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.filter(User::is_active))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await.context("Failed to get user by ID")?)
    }

    /// Whether no account exists yet
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Update the caller's own profile
    pub async fn update_profile(&self, user_id: i64, input: ProfileInput) -> Result<User, UserServiceError> {
        let mut user = self.require_user(user_id).await?;

        if let Some(email) = input.email {
            let email = email.trim().to_string();
            if !email.eq_ignore_ascii_case(&user.email) {
                validate_email(&email)?;
                if self.user_repo.get_by_email(&email).await.context("Failed to check email")?.is_some() {
                    return Err(UserServiceError::UserExists(format!("Email '{}' is already registered", email)));
                }
                user.email = email;
            }
        }
        if let Some(display_name) = input.display_name {
            user.display_name = non_empty(Some(display_name));
        }
        if let Some(phone) = input.phone {
            user.phone = non_empty(Some(phone));
        }
        if let Some(business_name) = input.business_name {
            user.business_name = non_empty(Some(business_name));
        }

        Ok(self.user_repo.update(&user).await.context("Failed to update user")?)
    }

    /// Change password after checking the current one
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        let mut user = self.require_user(user_id).await?;

        let valid = verify_password(current_password, &user.password_hash).context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        check_password_policy(new_password).map_err(UserServiceError::ValidationError)?;

        user.password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo.update(&user).await.context("Failed to update password")?;
        Ok(())
    }

    // ========================================================================
    // Admin user management
    // ========================================================================

    pub async fn list_users(
        &self,
        role: Option<UserRole>,
        params: &ListParams,
    ) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self.user_repo.list(role, params).await.context("Failed to list users")?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Create an account with any role
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        check_password_policy(&input.password).map_err(UserServiceError::ValidationError)?;
        self.ensure_unique(&input.username, &input.email).await?;

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let mut user = User::new(
            input.username.trim().to_string(),
            input.email.trim().to_string(),
            password_hash,
            input.role,
        );
        user.display_name = non_empty(input.display_name);
        user.phone = non_empty(input.phone);
        user.business_name = non_empty(input.business_name);

        let created = self.user_repo.create(&user).await.context("Failed to create user")?;
        tracing::info!(user_id = created.id, role = %created.role, "User created by admin");
        Ok(created)
    }

    /// Change role, status or profile of any account.
    ///
    /// An admin cannot demote or ban themself. Banning ends all of the
    /// target's sessions.
    pub async fn admin_update_user(
        &self,
        actor: &User,
        id: i64,
        input: AdminUpdateUserInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self.require_user(id).await?;

        if actor.id == id {
            if input.role.is_some_and(|role| role != UserRole::Admin) {
                return Err(UserServiceError::Forbidden("You cannot change your own role".to_string()));
            }
            if input.status == Some(UserStatus::Banned) {
                return Err(UserServiceError::Forbidden("You cannot ban yourself".to_string()));
            }
        }

        if let Some(role) = input.role {
            user.role = role;
        }
        let banning = input.status == Some(UserStatus::Banned) && !user.is_banned();
        if let Some(status) = input.status {
            user.status = status;
        }

        if let Some(v) = input.display_name {
            user.display_name = non_empty(Some(v));
        }
        if let Some(v) = input.phone {
            user.phone = non_empty(Some(v));
        }
        if let Some(v) = input.business_name {
            user.business_name = non_empty(Some(v));
        }
        if let Some(email) = input.email {
            let email = email.trim().to_string();
            if !email.eq_ignore_ascii_case(&user.email) {
                validate_email(&email)?;
                if self.user_repo.get_by_email(&email).await.context("Failed to check email")?.is_some() {
                    return Err(UserServiceError::UserExists(format!("Email '{}' is already registered", email)));
                }
                user.email = email;
            }
        }

        let updated = self.user_repo.update(&user).await.context("Failed to update user")?;

        if banning {
            self.session_repo
                .delete_by_user(id)
                .await
                .context("Failed to end sessions of banned user")?;
        }

        tracing::info!(actor = actor.id, user_id = id, role = %updated.role, status = %updated.status, "User updated by admin");
        Ok(updated)
    }

    /// Delete an account; an admin cannot delete themself
    pub async fn delete_user(&self, actor: &User, id: i64) -> Result<(), UserServiceError> {
        if actor.id == id {
            return Err(UserServiceError::Forbidden("You cannot delete your own account".to_string()));
        }
        self.require_user(id).await?;
        self.user_repo.delete(id).await.context("Failed to delete user")?;
        tracing::info!(actor = actor.id, user_id = id, "User deleted by admin");
        Ok(())
    }

    /// Create the configured admin when the system has none.
    ///
    /// Returns the created account, or `None` when an admin already exists.
    pub async fn ensure_admin(&self, config: &AdminBootstrapConfig) -> Result<Option<User>, UserServiceError> {
        let admins = self
            .user_repo
            .count_by_role(UserRole::Admin)
            .await
            .context("Failed to count admins")?;
        if admins > 0 {
            return Ok(None);
        }

        let admin = self
            .create_user(CreateUserInput {
                username: config.username.clone(),
                email: config.email.clone(),
                password: config.password.clone(),
                role: UserRole::Admin,
                display_name: None,
                phone: None,
                business_name: None,
            })
            .await?;
        Ok(Some(admin))
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn require_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)
    }

    async fn ensure_unique(&self, username: &str, email: &str) -> Result<(), UserServiceError> {
        if self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username.trim()
            )));
        }

        if self
            .user_repo
            .get_by_email(email.trim())
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email.trim()
            )));
        }
        Ok(())
    }

    /// Key for the failed-login window: the resolved account when one
    /// exists, otherwise the normalized input
    pub async fn login_attempt_key(&self, username_or_email: &str) -> Result<String, UserServiceError> {
        let login = username_or_email.trim();
        Ok(match self.find_user_by_username_or_email(login).await? {
            Some(user) => format!("user:{}", user.id),
            None => login.to_lowercase(),
        })
    }

    async fn find_user_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        Ok(self
            .user_repo
            .get_by_email(username_or_email)
            .await
            .context("Failed to get user by email")?)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::new(user_id, Duration::days(self.session_expiration_days));
        Ok(self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?)
    }
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(UserServiceError::ValidationError("Username cannot be empty".to_string()));
    }
    if username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Username cannot exceed {} characters",
            USERNAME_MAX_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(UserServiceError::ValidationError(
            "Username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(UserServiceError::ValidationError("Email cannot be empty".to_string()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !email.contains(' ') => Ok(()),
        _ => Err(UserServiceError::ValidationError("Invalid email format".to_string())),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Input for self-registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

impl RegisterInput {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}

/// Profile changes; `None` leaves a column untouched, an empty string clears it
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub business_name: Option<String>,
}

/// Admin-side account creation
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub business_name: Option<String>,
}

impl CreateUserInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role,
            display_name: None,
            phone: None,
            business_name: None,
        }
    }

    pub fn with_business_name(mut self, business_name: impl Into<String>) -> Self {
        self.business_name = Some(business_name.into());
        self
    }
}

/// Admin-side account update
#[derive(Debug, Clone, Default)]
pub struct AdminUpdateUserInput {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub business_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    async fn register(service: &UserService, name: &str) -> User {
        service
            .register(RegisterInput::new(name, format!("{}@example.com", name), "password123"))
            .await
            .expect("Failed to register")
    }

    // ========================================================================
    // Registration tests
    // ========================================================================

    #[tokio::test]
    async fn test_first_user_becomes_admin_then_users() {
        let service = setup_test_service().await;

        let first = register(&service, "founder").await;
        let second = register(&service, "traveler").await;

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_register_duplicates_fail() {
        let service = setup_test_service().await;
        register(&service, "traveler").await;

        let same_name = service
            .register(RegisterInput::new("traveler", "other@example.com", "password123"))
            .await;
        let same_email = service
            .register(RegisterInput::new("other", "traveler@example.com", "password123"))
            .await;

        assert!(matches!(same_name, Err(UserServiceError::UserExists(_))));
        assert!(matches!(same_email, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = setup_test_service().await;
        let cases = [
            RegisterInput::new("", "a@example.com", "password123"),
            RegisterInput::new("bad name", "a@example.com", "password123"),
            RegisterInput::new("alice", "invalid-email", "password123"),
            RegisterInput::new("alice", "a@example.com", "short"),
        ];

        for input in cases {
            let result = service.register(input.clone()).await;
            assert!(
                matches!(result, Err(UserServiceError::ValidationError(_))),
                "expected validation error for {:?}",
                input
            );
        }
    }

    // ========================================================================
    // Login / session tests
    // ========================================================================

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let service = setup_test_service().await;
        register(&service, "traveler").await;

        let (session, user) = service
            .login(LoginInput::new("traveler", "password123"))
            .await
            .unwrap();
        assert_eq!(user.username, "traveler");
        assert!(!session.is_expired());

        let (_, by_email) = service
            .login(LoginInput::new("traveler@example.com", "password123"))
            .await
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_login_wrong_password_or_unknown_user() {
        let service = setup_test_service().await;
        register(&service, "traveler").await;

        let wrong = service.login(LoginInput::new("traveler", "nope-nope")).await;
        let unknown = service.login(LoginInput::new("ghost", "password123")).await;

        assert!(matches!(wrong, Err(UserServiceError::AuthenticationError(_))));
        assert!(matches!(unknown, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_login_attempt_key_follows_the_account() {
        let service = setup_test_service().await;
        let user = register(&service, "traveler").await;

        let by_name = service.login_attempt_key("traveler").await.unwrap();
        let by_email = service.login_attempt_key(" traveler@example.com ").await.unwrap();
        let unknown = service.login_attempt_key("Ghost").await.unwrap();

        assert_eq!(by_name, format!("user:{}", user.id));
        assert_eq!(by_email, by_name);
        assert_eq!(unknown, "ghost");
    }

    #[tokio::test]
    async fn test_validate_session_and_logout() {
        let service = setup_test_service().await;
        register(&service, "traveler").await;
        let (session, user) = service.login(LoginInput::new("traveler", "password123")).await.unwrap();

        let validated = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(validated.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(service.validate_session("not-a-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ban_ends_sessions_and_blocks_login() {
        let service = setup_test_service().await;
        let admin = register(&service, "founder").await;
        let target = register(&service, "traveler").await;
        let (session, _) = service.login(LoginInput::new("traveler", "password123")).await.unwrap();

        let input = AdminUpdateUserInput {
            status: Some(UserStatus::Banned),
            ..AdminUpdateUserInput::default()
        };
        service.admin_update_user(&admin, target.id, input).await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        let login = service.login(LoginInput::new("traveler", "password123")).await;
        assert!(matches!(login, Err(UserServiceError::Banned)));
    }

    // ========================================================================
    // Profile tests
    // ========================================================================

    #[tokio::test]
    async fn test_update_profile() {
        let service = setup_test_service().await;
        let user = register(&service, "traveler").await;

        let updated = service
            .update_profile(
                user.id,
                ProfileInput {
                    display_name: Some("Tina Traveler".into()),
                    phone: Some("+62 812 000".into()),
                    ..ProfileInput::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name.as_deref(), Some("Tina Traveler"));
        assert_eq!(updated.phone.as_deref(), Some("+62 812 000"));
        assert_eq!(updated.email, "traveler@example.com");
    }

    #[tokio::test]
    async fn test_update_profile_email_conflict() {
        let service = setup_test_service().await;
        register(&service, "founder").await;
        let user = register(&service, "traveler").await;

        let result = service
            .update_profile(
                user.id,
                ProfileInput {
                    email: Some("founder@example.com".into()),
                    ..ProfileInput::default()
                },
            )
            .await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_change_password() {
        let service = setup_test_service().await;
        let user = register(&service, "traveler").await;

        let wrong = service.change_password(user.id, "bad-current", "newpassword1").await;
        assert!(matches!(wrong, Err(UserServiceError::AuthenticationError(_))));

        service
            .change_password(user.id, "password123", "newpassword1")
            .await
            .unwrap();
        assert!(service.login(LoginInput::new("traveler", "newpassword1")).await.is_ok());
        assert!(service.login(LoginInput::new("traveler", "password123")).await.is_err());
    }

    // ========================================================================
    // Admin management tests
    // ========================================================================

    #[tokio::test]
    async fn test_admin_create_and_list_by_role() {
        let service = setup_test_service().await;
        register(&service, "founder").await;
        service
            .create_user(
                CreateUserInput::new("guide", "guide@example.com", "password123", UserRole::ServiceProvider)
                    .with_business_name("Guide Co"),
            )
            .await
            .unwrap();

        let providers = service
            .list_users(Some(UserRole::ServiceProvider), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(providers.total, 1);
        assert_eq!(providers.items[0].business_name.as_deref(), Some("Guide Co"));

        let everyone = service.list_users(None, &ListParams::default()).await.unwrap();
        assert_eq!(everyone.total, 2);
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_ban_or_delete_self() {
        let service = setup_test_service().await;
        let admin = register(&service, "founder").await;

        let demote = AdminUpdateUserInput {
            role: Some(UserRole::User),
            ..AdminUpdateUserInput::default()
        };
        let ban = AdminUpdateUserInput {
            status: Some(UserStatus::Banned),
            ..AdminUpdateUserInput::default()
        };

        assert!(matches!(
            service.admin_update_user(&admin, admin.id, demote).await,
            Err(UserServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.admin_update_user(&admin, admin.id, ban).await,
            Err(UserServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete_user(&admin, admin.id).await,
            Err(UserServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_promotes_and_deletes_user() {
        let service = setup_test_service().await;
        let admin = register(&service, "founder").await;
        let user = register(&service, "traveler").await;

        let promoted = service
            .admin_update_user(
                &admin,
                user.id,
                AdminUpdateUserInput {
                    role: Some(UserRole::ServiceProvider),
                    business_name: Some("Island Hops".into()),
                    ..AdminUpdateUserInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, UserRole::ServiceProvider);
        assert_eq!(promoted.business_name.as_deref(), Some("Island Hops"));

        service.delete_user(&admin, user.id).await.unwrap();
        assert!(service.get_by_id(user.id).await.unwrap().is_none());
        assert!(matches!(
            service.delete_user(&admin, user.id).await,
            Err(UserServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_ensure_admin_only_when_missing() {
        let service = setup_test_service().await;
        let config = AdminBootstrapConfig {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "password123".into(),
        };

        let created = service.ensure_admin(&config).await.unwrap();
        assert_eq!(created.map(|u| u.role), Some(UserRole::Admin));
        assert!(service.ensure_admin(&config).await.unwrap().is_none());
    }
}
