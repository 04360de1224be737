//! Form field repository
//!
//! Field options are stored as a JSON object in a TEXT column.

use crate::db::pool::Backend;
use crate::db::DynDatabasePool;
use crate::models::{FieldOptions, FormField};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const FIELD_COLUMNS: &str = "id, category_id, name, label, field_type, required, sort_order, width, \
     options, placeholder, help_text, created_at, updated_at";

#[async_trait]
pub trait FormFieldRepository: Send + Sync {
    async fn create(&self, field: &FormField) -> Result<FormField>;

    async fn get_by_id(&self, id: i64) -> Result<Option<FormField>>;

    /// Fields of a category in form order
    async fn list_by_category(&self, category_id: i64) -> Result<Vec<FormField>>;

    async fn update(&self, field: &FormField) -> Result<FormField>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Field name taken within the category
    async fn exists_by_name(&self, category_id: i64, name: &str) -> Result<bool>;

    /// Highest sort order in the category, `None` when it has no fields
    async fn max_sort_order(&self, category_id: i64) -> Result<Option<i32>>;

    /// Set `sort_order` to the position of each id in `ids`
    async fn reorder(&self, category_id: i64, ids: &[i64]) -> Result<()>;
}

pub struct SqlxFormFieldRepository {
    pool: DynDatabasePool,
}

impl SqlxFormFieldRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FormFieldRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_FIELD: &str = r#"
    INSERT INTO form_fields (category_id, name, label, field_type, required, sort_order, width,
                             options, placeholder, help_text, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_FIELD: &str = r#"
    UPDATE form_fields
    SET name = ?, label = ?, field_type = ?, required = ?, sort_order = ?, width = ?,
        options = ?, placeholder = ?, help_text = ?, updated_at = ?
    WHERE id = ?
"#;

const UPDATE_SORT_ORDER: &str = "UPDATE form_fields SET sort_order = ?, updated_at = ? WHERE id = ? AND category_id = ?";

#[async_trait]
impl FormFieldRepository for SqlxFormFieldRepository {
    async fn create(&self, field: &FormField) -> Result<FormField> {
        let now = Utc::now();
        let options = serde_json::to_string(&field.options)?;
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(INSERT_FIELD)
                .bind(field.category_id)
                .bind(&field.name)
                .bind(&field.label)
                .bind(field.field_type.as_str())
                .bind(field.required)
                .bind(field.sort_order)
                .bind(field.width.to_string())
                .bind(&options)
                .bind(&field.placeholder)
                .bind(&field.help_text)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create form field")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_FIELD)
                .bind(field.category_id)
                .bind(&field.name)
                .bind(&field.label)
                .bind(field.field_type.as_str())
                .bind(field.required)
                .bind(field.sort_order)
                .bind(field.width.to_string())
                .bind(&options)
                .bind(&field.placeholder)
                .bind(&field.help_text)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create form field")?
                .last_insert_id() as i64,
        };

        Ok(FormField {
            id,
            created_at: now,
            updated_at: now,
            ..field.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<FormField>> {
        let sql = format!("SELECT {} FROM form_fields WHERE id = ?", FIELD_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get form field")?
                .as_ref()
                .map(row_to_field_sqlite)
                .transpose(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get form field")?
                .as_ref()
                .map(row_to_field_mysql)
                .transpose(),
        }
    }

    async fn list_by_category(&self, category_id: i64) -> Result<Vec<FormField>> {
        let sql = format!(
            "SELECT {} FROM form_fields WHERE category_id = ? ORDER BY sort_order ASC, id ASC",
            FIELD_COLUMNS
        );
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(category_id)
                .fetch_all(pool)
                .await
                .context("Failed to list form fields")?
                .iter()
                .map(row_to_field_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(category_id)
                .fetch_all(pool)
                .await
                .context("Failed to list form fields")?
                .iter()
                .map(row_to_field_mysql)
                .collect(),
        }
    }

    async fn update(&self, field: &FormField) -> Result<FormField> {
        let now = Utc::now();
        let options = serde_json::to_string(&field.options)?;
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(UPDATE_FIELD)
                    .bind(&field.name)
                    .bind(&field.label)
                    .bind(field.field_type.as_str())
                    .bind(field.required)
                    .bind(field.sort_order)
                    .bind(field.width.to_string())
                    .bind(&options)
                    .bind(&field.placeholder)
                    .bind(&field.help_text)
                    .bind(now)
                    .bind(field.id)
                    .execute(pool)
                    .await
                    .context("Failed to update form field")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(UPDATE_FIELD)
                    .bind(&field.name)
                    .bind(&field.label)
                    .bind(field.field_type.as_str())
                    .bind(field.required)
                    .bind(field.sort_order)
                    .bind(field.width.to_string())
                    .bind(&options)
                    .bind(&field.placeholder)
                    .bind(&field.help_text)
                    .bind(now)
                    .bind(field.id)
                    .execute(pool)
                    .await
                    .context("Failed to update form field")?;
            }
        }
        self.get_by_id(field.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Form field not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM form_fields WHERE id = ?";
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(sql).bind(id).execute(pool).await.context("Failed to delete form field")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql).bind(id).execute(pool).await.context("Failed to delete form field")?;
            }
        }
        Ok(())
    }

    async fn exists_by_name(&self, category_id: i64, name: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM form_fields WHERE category_id = ? AND name = ?";
        let count: i64 = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(category_id)
                .bind(name)
                .fetch_one(pool)
                .await
                .context("Failed to check form field")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(category_id)
                .bind(name)
                .fetch_one(pool)
                .await
                .context("Failed to check form field")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn max_sort_order(&self, category_id: i64) -> Result<Option<i32>> {
        let sql = "SELECT MAX(sort_order) AS max_order FROM form_fields WHERE category_id = ?";
        let max: Option<i64> = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(category_id)
                .fetch_one(pool)
                .await
                .context("Failed to read sort order")?
                .get("max_order"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(category_id)
                .fetch_one(pool)
                .await
                .context("Failed to read sort order")?
                .get("max_order"),
        };
        Ok(max.map(|m| m as i32))
    }

    async fn reorder(&self, category_id: i64, ids: &[i64]) -> Result<()> {
        let now = Utc::now();
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for (position, id) in ids.iter().enumerate() {
                    sqlx::query(UPDATE_SORT_ORDER)
                        .bind(position as i32)
                        .bind(now)
                        .bind(id)
                        .bind(category_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to reorder form fields")?;
                }
                tx.commit().await.context("Failed to commit field order")?;
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for (position, id) in ids.iter().enumerate() {
                    sqlx::query(UPDATE_SORT_ORDER)
                        .bind(position as i32)
                        .bind(now)
                        .bind(id)
                        .bind(category_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to reorder form fields")?;
                }
                tx.commit().await.context("Failed to commit field order")?;
            }
        }
        Ok(())
    }
}

fn parse_options(raw: &str) -> FieldOptions {
    serde_json::from_str(raw).unwrap_or_default()
}

fn row_to_field_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<FormField> {
    let field_type: String = row.get("field_type");
    let width: String = row.get("width");
    let options: String = row.get("options");
    Ok(FormField {
        id: row.get("id"),
        category_id: row.get("category_id"),
        name: row.get("name"),
        label: row.get("label"),
        field_type: field_type.parse()?,
        required: row.get("required"),
        sort_order: row.get("sort_order"),
        width: width.parse().unwrap_or_default(),
        options: parse_options(&options),
        placeholder: row.get("placeholder"),
        help_text: row.get("help_text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_field_mysql(row: &sqlx::mysql::MySqlRow) -> Result<FormField> {
    let field_type: String = row.get("field_type");
    let width: String = row.get("width");
    let options: String = row.get("options");
    Ok(FormField {
        id: row.get("id"),
        category_id: row.get("category_id"),
        name: row.get("name"),
        label: row.get("label"),
        field_type: field_type.parse()?,
        required: row.get("required"),
        sort_order: row.get("sort_order"),
        width: width.parse().unwrap_or_default(),
        options: parse_options(&options),
        placeholder: row.get("placeholder"),
        help_text: row.get("help_text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{CategoryRepository, SqlxCategoryRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, FieldType, FieldWidth};

    async fn setup_test_repo() -> (SqlxFormFieldRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let category = SqlxCategoryRepository::new(pool.clone())
            .create(&Category::new("beach".into(), "Beach".into(), None, 0))
            .await
            .unwrap();
        (SqlxFormFieldRepository::new(pool), category.id)
    }

    fn field(category_id: i64, name: &str, field_type: FieldType, sort_order: i32) -> FormField {
        let mut field = FormField::new(category_id, name.to_string(), name.to_uppercase(), field_type);
        field.sort_order = sort_order;
        field
    }

    #[tokio::test]
    async fn test_create_persists_options_and_flags() {
        let (repo, category_id) = setup_test_repo().await;
        let mut input = field(category_id, "season", FieldType::Select, 0);
        input.required = true;
        input.width = FieldWidth::Half;
        input.options.choices = vec!["summer".into(), "winter".into()];

        let created = repo.create(&input).await.unwrap();
        let loaded = repo.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(loaded.field_type, FieldType::Select);
        assert!(loaded.required);
        assert_eq!(loaded.width, FieldWidth::Half);
        assert_eq!(loaded.options.choices, vec!["summer", "winter"]);
    }

    #[tokio::test]
    async fn test_list_order_and_max_sort_order() {
        let (repo, category_id) = setup_test_repo().await;
        assert_eq!(repo.max_sort_order(category_id).await.unwrap(), None);

        repo.create(&field(category_id, "b", FieldType::Text, 2)).await.unwrap();
        repo.create(&field(category_id, "a", FieldType::Text, 1)).await.unwrap();

        let names: Vec<String> = repo
            .list_by_category(category_id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(repo.max_sort_order(category_id).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_reorder() {
        let (repo, category_id) = setup_test_repo().await;
        let a = repo.create(&field(category_id, "a", FieldType::Text, 0)).await.unwrap();
        let b = repo.create(&field(category_id, "b", FieldType::Number, 1)).await.unwrap();
        let c = repo.create(&field(category_id, "c", FieldType::Date, 2)).await.unwrap();

        repo.reorder(category_id, &[c.id, a.id, b.id]).await.unwrap();

        let ids: Vec<i64> = repo
            .list_by_category(category_id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_and_delete() {
        let (repo, category_id) = setup_test_repo().await;
        let created = repo.create(&field(category_id, "depth", FieldType::Number, 0)).await.unwrap();

        assert!(repo.exists_by_name(category_id, "depth").await.unwrap());
        assert!(repo.create(&field(category_id, "depth", FieldType::Text, 1)).await.is_err());

        repo.delete(created.id).await.unwrap();
        assert!(!repo.exists_by_name(category_id, "depth").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_field() {
        let (repo, category_id) = setup_test_repo().await;
        let mut created = repo.create(&field(category_id, "depth", FieldType::Number, 0)).await.unwrap();

        created.label = "Max depth (m)".into();
        created.options.max = Some(40.0);
        let updated = repo.update(&created).await.unwrap();

        assert_eq!(updated.label, "Max depth (m)");
        assert_eq!(updated.options.max, Some(40.0));
    }
}
