//! Category repository
//!
//! Database operations for top-level categories.

use crate::db::pool::Backend;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const CATEGORY_COLUMNS: &str = "id, slug, name, description, image, sort_order, created_at, updated_at";

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories by sort order, then name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Update a category
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category (subcategories, fields and assignments cascade)
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a category name already exists
    async fn exists_by_name(&self, name: &str) -> Result<bool>;

    /// Check if a category slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Number of destinations filed under the category
    async fn count_destinations(&self, id: i64) -> Result<i64>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_where(&self, clause: &str, value: Bind<'_>) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE {}", CATEGORY_COLUMNS, clause);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let query = sqlx::query(&sql);
                let query = match value {
                    Bind::Int(v) => query.bind(v),
                    Bind::Text(v) => query.bind(v),
                };
                let row = query.fetch_optional(pool).await.context("Failed to get category")?;
                Ok(row.as_ref().map(row_to_category_sqlite))
            }
            Backend::Mysql(pool) => {
                let query = sqlx::query(&sql);
                let query = match value {
                    Bind::Int(v) => query.bind(v),
                    Bind::Text(v) => query.bind(v),
                };
                let row = query.fetch_optional(pool).await.context("Failed to get category")?;
                Ok(row.as_ref().map(row_to_category_mysql))
            }
        }
    }

    async fn count_where(&self, sql: &str, value: Bind<'_>) -> Result<i64> {
        let count = match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let query = sqlx::query(sql);
                let query = match value {
                    Bind::Int(v) => query.bind(v),
                    Bind::Text(v) => query.bind(v),
                };
                query.fetch_one(pool).await.context("Failed to count")?.get("count")
            }
            Backend::Mysql(pool) => {
                let query = sqlx::query(sql);
                let query = match value {
                    Bind::Int(v) => query.bind(v),
                    Bind::Text(v) => query.bind(v),
                };
                query.fetch_one(pool).await.context("Failed to count")?.get("count")
            }
        };
        Ok(count)
    }
}

/// Single lookup parameter
enum Bind<'a> {
    Int(i64),
    Text(&'a str),
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => create_category_sqlite(pool, category).await,
            Backend::Mysql(pool) => create_category_mysql(pool, category).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        self.fetch_one_where("id = ?", Bind::Int(id)).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        self.fetch_one_where("slug = ?", Bind::Text(slug)).await
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories ORDER BY sort_order ASC, name ASC",
            CATEGORY_COLUMNS
        );
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list categories")?;
                Ok(rows.iter().map(row_to_category_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list categories")?;
                Ok(rows.iter().map(row_to_category_mysql).collect())
            }
        }
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => update_category_sqlite(pool, category).await?,
            Backend::Mysql(pool) => update_category_mysql(pool, category).await?,
        }
        self.get_by_id(category.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM categories WHERE id = ?";
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(sql).bind(id).execute(pool).await.context("Failed to delete category")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql).bind(id).execute(pool).await.context("Failed to delete category")?;
            }
        }
        Ok(())
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool> {
        let count = self
            .count_where("SELECT COUNT(*) AS count FROM categories WHERE name = ?", Bind::Text(name))
            .await?;
        Ok(count > 0)
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let count = self
            .count_where("SELECT COUNT(*) AS count FROM categories WHERE slug = ?", Bind::Text(slug))
            .await?;
        Ok(count > 0)
    }

    async fn count_destinations(&self, id: i64) -> Result<i64> {
        self.count_where(
            "SELECT COUNT(*) AS count FROM destinations WHERE category_id = ?",
            Bind::Int(id),
        )
        .await
    }
}

const INSERT_CATEGORY: &str = r#"
    INSERT INTO categories (slug, name, description, image, sort_order, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_CATEGORY: &str = r#"
    UPDATE categories
    SET slug = ?, name = ?, description = ?, image = ?, sort_order = ?, updated_at = ?
    WHERE id = ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();
    let result = sqlx::query(INSERT_CATEGORY)
        .bind(&category.slug)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image)
        .bind(category.sort_order)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..category.clone()
    })
}

async fn update_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<()> {
    sqlx::query(UPDATE_CATEGORY)
        .bind(&category.slug)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image)
        .bind(category.sort_order)
        .bind(Utc::now())
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;
    Ok(())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        image: row.get("image"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();
    let result = sqlx::query(INSERT_CATEGORY)
        .bind(&category.slug)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image)
        .bind(category.sort_order)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..category.clone()
    })
}

async fn update_category_mysql(pool: &MySqlPool, category: &Category) -> Result<()> {
    sqlx::query(UPDATE_CATEGORY)
        .bind(&category.slug)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image)
        .bind(category.sort_order)
        .bind(Utc::now())
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;
    Ok(())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        image: row.get("image"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    fn category(slug: &str, name: &str, sort_order: i32) -> Category {
        Category::new(slug.to_string(), name.to_string(), None, sort_order)
    }

    #[tokio::test]
    async fn test_create_and_get_category() {
        let (_pool, repo) = setup_test_repo().await;
        let mut input = category("beach", "Beach", 0);
        input.image = Some("/uploads/beach.jpg".to_string());

        let created = repo.create(&input).await.expect("Failed to create category");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        let by_slug = repo.get_by_slug("beach").await.unwrap().unwrap();
        assert_eq!(by_id.id, by_slug.id);
        assert_eq!(by_id.image.as_deref(), Some("/uploads/beach.jpg"));
        assert!(repo.get_by_slug("desert").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_sort_order_then_name() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&category("mountain", "Mountain", 1)).await.unwrap();
        repo.create(&category("city", "City", 0)).await.unwrap();
        repo.create(&category("beach", "Beach", 1)).await.unwrap();

        let slugs: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.slug).collect();
        assert_eq!(slugs, vec!["city", "beach", "mountain"]);
    }

    #[tokio::test]
    async fn test_update_category() {
        let (_pool, repo) = setup_test_repo().await;
        let mut created = repo.create(&category("beach", "Beach", 0)).await.unwrap();

        created.name = "Beaches".to_string();
        created.description = Some("Sun and sand".to_string());
        let updated = repo.update(&created).await.unwrap();

        assert_eq!(updated.name, "Beaches");
        assert_eq!(updated.description.as_deref(), Some("Sun and sand"));
    }

    #[tokio::test]
    async fn test_exists_checks() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&category("beach", "Beach", 0)).await.unwrap();

        assert!(repo.exists_by_name("Beach").await.unwrap());
        assert!(repo.exists_by_slug("beach").await.unwrap());
        assert!(!repo.exists_by_name("Desert").await.unwrap());
        assert!(!repo.exists_by_slug("desert").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_and_count_destinations() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(&category("beach", "Beach", 0)).await.unwrap();

        assert_eq!(repo.count_destinations(created.id).await.unwrap(), 0);
        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
