//! Subcategory repository

use crate::db::pool::Backend;
use crate::db::DynDatabasePool;
use crate::models::Subcategory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const SUBCATEGORY_COLUMNS: &str =
    "id, category_id, slug, name, description, sort_order, created_at, updated_at";

/// Subcategory repository trait
#[async_trait]
pub trait SubcategoryRepository: Send + Sync {
    async fn create(&self, subcategory: &Subcategory) -> Result<Subcategory>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Subcategory>>;

    /// Subcategories of one category, by sort order then name
    async fn list_by_category(&self, category_id: i64) -> Result<Vec<Subcategory>>;

    /// Every subcategory, grouped by category
    async fn list_all(&self) -> Result<Vec<Subcategory>>;

    async fn update(&self, subcategory: &Subcategory) -> Result<Subcategory>;

    /// Delete a subcategory; destinations under it are detached
    async fn delete(&self, id: i64) -> Result<()>;

    /// Name taken within the category
    async fn exists_by_name(&self, category_id: i64, name: &str) -> Result<bool>;

    /// Slug taken within the category
    async fn exists_by_slug(&self, category_id: i64, slug: &str) -> Result<bool>;
}

/// SQLx-based subcategory repository implementation
pub struct SqlxSubcategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxSubcategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubcategoryRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_many(&self, sql: &str, category_id: Option<i64>) -> Result<Vec<Subcategory>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(sql);
                if let Some(id) = category_id {
                    query = query.bind(id);
                }
                let rows = query.fetch_all(pool).await.context("Failed to list subcategories")?;
                Ok(rows.iter().map(row_to_subcategory_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(sql);
                if let Some(id) = category_id {
                    query = query.bind(id);
                }
                let rows = query.fetch_all(pool).await.context("Failed to list subcategories")?;
                Ok(rows.iter().map(row_to_subcategory_mysql).collect())
            }
        }
    }

    async fn exists(&self, column: &str, category_id: i64, value: &str) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM subcategories WHERE category_id = ? AND {} = ?",
            column
        );
        let count: i64 = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(category_id)
                .bind(value)
                .fetch_one(pool)
                .await
                .context("Failed to check subcategory")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(category_id)
                .bind(value)
                .fetch_one(pool)
                .await
                .context("Failed to check subcategory")?
                .get("count"),
        };
        Ok(count > 0)
    }
}

const INSERT_SUBCATEGORY: &str = r#"
    INSERT INTO subcategories (category_id, slug, name, description, sort_order, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_SUBCATEGORY: &str = r#"
    UPDATE subcategories
    SET slug = ?, name = ?, description = ?, sort_order = ?, updated_at = ?
    WHERE id = ?
"#;

#[async_trait]
impl SubcategoryRepository for SqlxSubcategoryRepository {
    async fn create(&self, subcategory: &Subcategory) -> Result<Subcategory> {
        let now = Utc::now();
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(INSERT_SUBCATEGORY)
                .bind(subcategory.category_id)
                .bind(&subcategory.slug)
                .bind(&subcategory.name)
                .bind(&subcategory.description)
                .bind(subcategory.sort_order)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create subcategory")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_SUBCATEGORY)
                .bind(subcategory.category_id)
                .bind(&subcategory.slug)
                .bind(&subcategory.name)
                .bind(&subcategory.description)
                .bind(subcategory.sort_order)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create subcategory")?
                .last_insert_id() as i64,
        };

        Ok(Subcategory {
            id,
            created_at: now,
            updated_at: now,
            ..subcategory.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Subcategory>> {
        let sql = format!("SELECT {} FROM subcategories WHERE id = ?", SUBCATEGORY_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get subcategory")?;
                Ok(row.as_ref().map(row_to_subcategory_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get subcategory")?;
                Ok(row.as_ref().map(row_to_subcategory_mysql))
            }
        }
    }

    async fn list_by_category(&self, category_id: i64) -> Result<Vec<Subcategory>> {
        let sql = format!(
            "SELECT {} FROM subcategories WHERE category_id = ? ORDER BY sort_order ASC, name ASC",
            SUBCATEGORY_COLUMNS
        );
        self.fetch_many(&sql, Some(category_id)).await
    }

    async fn list_all(&self) -> Result<Vec<Subcategory>> {
        let sql = format!(
            "SELECT {} FROM subcategories ORDER BY category_id ASC, sort_order ASC, name ASC",
            SUBCATEGORY_COLUMNS
        );
        self.fetch_many(&sql, None).await
    }

    async fn update(&self, subcategory: &Subcategory) -> Result<Subcategory> {
        let now = Utc::now();
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(UPDATE_SUBCATEGORY)
                    .bind(&subcategory.slug)
                    .bind(&subcategory.name)
                    .bind(&subcategory.description)
                    .bind(subcategory.sort_order)
                    .bind(now)
                    .bind(subcategory.id)
                    .execute(pool)
                    .await
                    .context("Failed to update subcategory")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(UPDATE_SUBCATEGORY)
                    .bind(&subcategory.slug)
                    .bind(&subcategory.name)
                    .bind(&subcategory.description)
                    .bind(subcategory.sort_order)
                    .bind(now)
                    .bind(subcategory.id)
                    .execute(pool)
                    .await
                    .context("Failed to update subcategory")?;
            }
        }
        self.get_by_id(subcategory.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Subcategory not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM subcategories WHERE id = ?";
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(sql).bind(id).execute(pool).await.context("Failed to delete subcategory")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql).bind(id).execute(pool).await.context("Failed to delete subcategory")?;
            }
        }
        Ok(())
    }

    async fn exists_by_name(&self, category_id: i64, name: &str) -> Result<bool> {
        self.exists("name", category_id, name).await
    }

    async fn exists_by_slug(&self, category_id: i64, slug: &str) -> Result<bool> {
        self.exists("slug", category_id, slug).await
    }
}

fn row_to_subcategory_sqlite(row: &sqlx::sqlite::SqliteRow) -> Subcategory {
    Subcategory {
        id: row.get("id"),
        category_id: row.get("category_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_subcategory_mysql(row: &sqlx::mysql::MySqlRow) -> Subcategory {
    Subcategory {
        id: row.get("id"),
        category_id: row.get("category_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{CategoryRepository, SqlxCategoryRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Category;

    async fn setup_test_repo() -> (SqlxSubcategoryRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let categories = SqlxCategoryRepository::new(pool.clone());
        let beach = categories
            .create(&Category::new("beach".into(), "Beach".into(), None, 0))
            .await
            .unwrap();
        let mountain = categories
            .create(&Category::new("mountain".into(), "Mountain".into(), None, 1))
            .await
            .unwrap();

        (SqlxSubcategoryRepository::new(pool), beach.id, mountain.id)
    }

    fn sub(category_id: i64, slug: &str, sort_order: i32) -> Subcategory {
        Subcategory::new(category_id, slug.to_string(), slug.to_uppercase(), None, sort_order)
    }

    #[tokio::test]
    async fn test_create_and_list_by_category() {
        let (repo, beach, mountain) = setup_test_repo().await;
        repo.create(&sub(beach, "surf", 1)).await.unwrap();
        repo.create(&sub(beach, "diving", 0)).await.unwrap();
        repo.create(&sub(mountain, "hiking", 0)).await.unwrap();

        let beach_subs: Vec<String> = repo
            .list_by_category(beach)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.slug)
            .collect();
        assert_eq!(beach_subs, vec!["diving", "surf"]);
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_same_slug_allowed_across_categories() {
        let (repo, beach, mountain) = setup_test_repo().await;
        repo.create(&sub(beach, "camping", 0)).await.unwrap();
        repo.create(&sub(mountain, "camping", 0)).await.unwrap();

        assert!(repo.exists_by_slug(beach, "camping").await.unwrap());
        assert!(repo.exists_by_name(mountain, "CAMPING").await.unwrap());
        assert!(repo.create(&sub(beach, "camping", 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (repo, beach, _) = setup_test_repo().await;
        let mut created = repo.create(&sub(beach, "surf", 0)).await.unwrap();

        created.name = "Surfing".into();
        created.description = Some("Boards included".into());
        let updated = repo.update(&created).await.unwrap();
        assert_eq!(updated.name, "Surfing");

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
