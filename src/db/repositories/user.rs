//! User repository
//!
//! Database operations for user accounts of every role.

use crate::db::pool::Backend;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, User, UserRole, UserStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, status, display_name, phone, business_name, created_at, updated_at";

const DELETE_USER: &str = "DELETE FROM users WHERE id = ?";
const DISCOUNT_USER_LIKES: &str = r#"
    UPDATE destinations
    SET like_count = like_count - (SELECT COUNT(*) FROM likes WHERE likes.destination_id = destinations.id AND likes.user_id = ?)
    WHERE id IN (SELECT destination_id FROM likes WHERE user_id = ?)
"#;
const DISCOUNT_USER_COMMENTS: &str = r#"
    UPDATE destinations
    SET comment_count = comment_count - (SELECT COUNT(*) FROM comments WHERE comments.destination_id = destinations.id AND comments.user_id = ?)
    WHERE id IN (SELECT destination_id FROM comments WHERE user_id = ?)
"#;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update a user (all mutable columns)
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count all users
    async fn count(&self) -> Result<i64>;

    /// Count users holding a role
    async fn count_by_role(&self, role: UserRole) -> Result<i64>;

    /// List users newest first, optionally restricted to one role
    async fn list(&self, role: Option<UserRole>, params: &ListParams) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => create_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => create_user_mysql(pool, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(username)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by username")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(username)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by username")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(email)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by email")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(email)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by email")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => update_user_sqlite(pool, user).await?,
            Backend::Mysql(pool) => update_user_mysql(pool, user).await?,
        }
        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // Likes and comments cascade with the user; take them off the
        // destination counters first
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for sql in [DISCOUNT_USER_LIKES, DISCOUNT_USER_COMMENTS] {
                    sqlx::query(sql)
                        .bind(id)
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to update destination counters")?;
                }
                sqlx::query(DELETE_USER)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete user")?;
                tx.commit().await.context("Failed to commit user deletion")?;
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for sql in [DISCOUNT_USER_LIKES, DISCOUNT_USER_COMMENTS] {
                    sqlx::query(sql)
                        .bind(id)
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to update destination counters")?;
                }
                sqlx::query(DELETE_USER)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete user")?;
                tx.commit().await.context("Failed to commit user deletion")?;
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM users";
        let count = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count users")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count users")?
                .get("count"),
        };
        Ok(count)
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM users WHERE role = ?";
        let count = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(role.as_str())
                .fetch_one(pool)
                .await
                .context("Failed to count users by role")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(role.as_str())
                .fetch_one(pool)
                .await
                .context("Failed to count users by role")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list(&self, role: Option<UserRole>, params: &ListParams) -> Result<(Vec<User>, i64)> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => list_users_sqlite(pool, role, params).await,
            Backend::Mysql(pool) => list_users_mysql(pool, role, params).await,
        }
    }
}

const INSERT_USER: &str = r#"
    INSERT INTO users (username, email, password_hash, role, status, display_name, phone, business_name, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_USER: &str = r#"
    UPDATE users
    SET username = ?, email = ?, password_hash = ?, role = ?, status = ?,
        display_name = ?, phone = ?, business_name = ?, updated_at = ?
    WHERE id = ?
"#;

fn list_users_sql(role: Option<UserRole>) -> (String, String) {
    let filter = if role.is_some() { "WHERE role = ?" } else { "" };
    (
        format!(
            "SELECT {} FROM users {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS, filter
        ),
        format!("SELECT COUNT(*) AS count FROM users {}", filter),
    )
}

fn parse_role_and_status(role: &str, status: &str) -> Result<(UserRole, UserStatus)> {
    let role = UserRole::from_str(role).with_context(|| format!("Invalid role in database: {}", role))?;
    let status = UserStatus::from_str(status).unwrap_or_default();
    Ok((role, status))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.to_string())
        .bind(&user.display_name)
        .bind(&user.phone)
        .bind(&user.business_name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(UPDATE_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.to_string())
        .bind(&user.display_name)
        .bind(&user.phone)
        .bind(&user.business_name)
        .bind(Utc::now())
        .bind(user.id)
        .execute(pool)
        .await
        .context("Failed to update user")?;
    Ok(())
}

async fn list_users_sqlite(
    pool: &SqlitePool,
    role: Option<UserRole>,
    params: &ListParams,
) -> Result<(Vec<User>, i64)> {
    let (list_sql, count_sql) = list_users_sql(role);

    let mut query = sqlx::query(&list_sql);
    let mut count_query = sqlx::query(&count_sql);
    if let Some(role) = role {
        query = query.bind(role.as_str());
        count_query = count_query.bind(role.as_str());
    }

    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;
    let users = rows.iter().map(row_to_user_sqlite).collect::<Result<Vec<_>>>()?;

    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count users")?
        .get("count");

    Ok((users, total))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let (role, status) = parse_role_and_status(row.get("role"), row.get("status"))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        status,
        display_name: row.get("display_name"),
        phone: row.get("phone"),
        business_name: row.get("business_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.to_string())
        .bind(&user.display_name)
        .bind(&user.phone)
        .bind(&user.business_name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<()> {
    sqlx::query(UPDATE_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.to_string())
        .bind(&user.display_name)
        .bind(&user.phone)
        .bind(&user.business_name)
        .bind(Utc::now())
        .bind(user.id)
        .execute(pool)
        .await
        .context("Failed to update user")?;
    Ok(())
}

async fn list_users_mysql(
    pool: &MySqlPool,
    role: Option<UserRole>,
    params: &ListParams,
) -> Result<(Vec<User>, i64)> {
    let (list_sql, count_sql) = list_users_sql(role);

    let mut query = sqlx::query(&list_sql);
    let mut count_query = sqlx::query(&count_sql);
    if let Some(role) = role {
        query = query.bind(role.as_str());
        count_query = count_query.bind(role.as_str());
    }

    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;
    let users = rows.iter().map(row_to_user_mysql).collect::<Result<Vec<_>>>()?;

    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count users")?
        .get("count");

    Ok((users, total))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let (role, status) = parse_role_and_status(row.get("role"), row.get("status"))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        status,
        display_name: row.get("display_name"),
        phone: row.get("phone"),
        business_name: row.get("business_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    fn test_user(username: &str, role: UserRole) -> User {
        User::new(
            username.to_string(),
            format!("{}@example.com", username),
            "argon2-hash".to_string(),
            role,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (_pool, repo) = setup_test_repo().await;
        let mut user = test_user("islandtours", UserRole::ServiceProvider);
        user.phone = Some("+6281234".to_string());
        user.business_name = Some("Island Tours".to_string());

        let created = repo.create(&user).await.expect("Failed to create user");
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().expect("User not found");
        assert_eq!(found.username, "islandtours");
        assert_eq!(found.role, UserRole::ServiceProvider);
        assert_eq!(found.phone.as_deref(), Some("+6281234"));
        assert_eq!(found.business_name.as_deref(), Some("Island Tours"));
        assert_eq!(found.password_hash, "argon2-hash");
    }

    #[tokio::test]
    async fn test_get_by_username_and_email() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&test_user("traveler", UserRole::User)).await.unwrap();

        assert!(repo.get_by_username("traveler").await.unwrap().is_some());
        assert!(repo.get_by_email("traveler@example.com").await.unwrap().is_some());
        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user() {
        let (_pool, repo) = setup_test_repo().await;
        let mut user = repo.create(&test_user("traveler", UserRole::User)).await.unwrap();

        user.role = UserRole::ServiceProvider;
        user.status = UserStatus::Banned;
        user.display_name = Some("Trav".to_string());
        let updated = repo.update(&user).await.unwrap();

        assert_eq!(updated.role, UserRole::ServiceProvider);
        assert_eq!(updated.status, UserStatus::Banned);
        assert_eq!(updated.display_name.as_deref(), Some("Trav"));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (_pool, repo) = setup_test_repo().await;
        let user = repo.create(&test_user("traveler", UserRole::User)).await.unwrap();

        repo.delete(user.id).await.unwrap();
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_counts_and_role_filtered_list() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&test_user("admin", UserRole::Admin)).await.unwrap();
        repo.create(&test_user("p1", UserRole::ServiceProvider)).await.unwrap();
        repo.create(&test_user("p2", UserRole::ServiceProvider)).await.unwrap();
        repo.create(&test_user("u1", UserRole::User)).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 4);
        assert_eq!(repo.count_by_role(UserRole::ServiceProvider).await.unwrap(), 2);

        let (providers, total) = repo
            .list(Some(UserRole::ServiceProvider), &ListParams::new(1, 10))
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert!(providers.iter().all(|u| u.is_service_provider()));

        let (page, total) = repo.list(None, &ListParams::new(2, 3)).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_unique_username_constraint() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&test_user("traveler", UserRole::User)).await.unwrap();

        let mut duplicate = test_user("traveler", UserRole::User);
        duplicate.email = "other@example.com".to_string();
        assert!(repo.create(&duplicate).await.is_err());
    }
}
