//! Service provider category assignment repository

use crate::db::pool::Backend;
use crate::db::DynDatabasePool;
use crate::models::{AssignmentEntry, ServiceProviderCategory};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// All assignments of a provider
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<ServiceProviderCategory>>;

    /// Replace the provider's assignments with `entries`, atomically
    async fn replace(&self, user_id: i64, entries: &[AssignmentEntry]) -> Result<Vec<ServiceProviderCategory>>;

    /// Whether the provider may publish under the category (and subcategory).
    ///
    /// A whole-category assignment covers every subcategory.
    async fn has_assignment(&self, user_id: i64, category_id: i64, subcategory_id: Option<i64>) -> Result<bool>;
}

pub struct SqlxAssignmentRepository {
    pool: DynDatabasePool,
}

impl SqlxAssignmentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AssignmentRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_BY_USER: &str = r#"
    SELECT id, user_id, category_id, subcategory_id, created_at
    FROM service_provider_categories
    WHERE user_id = ?
    ORDER BY category_id ASC, subcategory_id ASC
"#;

const INSERT_ASSIGNMENT: &str = r#"
    INSERT INTO service_provider_categories (user_id, category_id, subcategory_id, created_at)
    VALUES (?, ?, ?, ?)
"#;

const COUNT_MATCHING: &str = r#"
    SELECT COUNT(*) AS count FROM service_provider_categories
    WHERE user_id = ? AND category_id = ?
      AND (? IS NULL OR subcategory_id IS NULL OR subcategory_id = ?)
"#;

#[async_trait]
impl AssignmentRepository for SqlxAssignmentRepository {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<ServiceProviderCategory>> {
        let assignments = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(SELECT_BY_USER)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .context("Failed to list assignments")?
                .iter()
                .map(|row| ServiceProviderCategory {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    category_id: row.get("category_id"),
                    subcategory_id: row.get("subcategory_id"),
                    created_at: row.get("created_at"),
                })
                .collect(),
            Backend::Mysql(pool) => sqlx::query(SELECT_BY_USER)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .context("Failed to list assignments")?
                .iter()
                .map(|row| ServiceProviderCategory {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    category_id: row.get("category_id"),
                    subcategory_id: row.get("subcategory_id"),
                    created_at: row.get("created_at"),
                })
                .collect(),
        };
        Ok(assignments)
    }

    async fn replace(&self, user_id: i64, entries: &[AssignmentEntry]) -> Result<Vec<ServiceProviderCategory>> {
        let delete = "DELETE FROM service_provider_categories WHERE user_id = ?";
        let now = Utc::now();

        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                sqlx::query(delete)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to clear assignments")?;
                for entry in entries {
                    sqlx::query(INSERT_ASSIGNMENT)
                        .bind(user_id)
                        .bind(entry.category_id)
                        .bind(entry.subcategory_id)
                        .bind(now)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to insert assignment")?;
                }
                tx.commit().await.context("Failed to commit assignments")?;
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                sqlx::query(delete)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to clear assignments")?;
                for entry in entries {
                    sqlx::query(INSERT_ASSIGNMENT)
                        .bind(user_id)
                        .bind(entry.category_id)
                        .bind(entry.subcategory_id)
                        .bind(now)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to insert assignment")?;
                }
                tx.commit().await.context("Failed to commit assignments")?;
            }
        }

        self.list_by_user(user_id).await
    }

    async fn has_assignment(&self, user_id: i64, category_id: i64, subcategory_id: Option<i64>) -> Result<bool> {
        // Without a subcategory any grant in the category matches
        let count: i64 = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(COUNT_MATCHING)
                .bind(user_id)
                .bind(category_id)
                .bind(subcategory_id)
                .bind(subcategory_id)
                .fetch_one(pool)
                .await
                .context("Failed to check assignment")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(COUNT_MATCHING)
                .bind(user_id)
                .bind(category_id)
                .bind(subcategory_id)
                .bind(subcategory_id)
                .fetch_one(pool)
                .await
                .context("Failed to check assignment")?
                .get("count"),
        };
        Ok(count > 0)
    }
}
