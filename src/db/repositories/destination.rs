//! Destination repository
//!
//! Gallery images and dynamic field values are stored as JSON text.
//! Listing queries are assembled from a [`DestinationFilter`]; every clause
//! uses `?` placeholders so the same SQL runs on both drivers.

use crate::db::pool::Backend;
use crate::db::DynDatabasePool;
use crate::models::{Destination, DestinationFilter, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const DESTINATION_COLUMNS: &str = "id, slug, title, description, category_id, subcategory_id, \
     creator_id, approver_id, status, price, discount_price, price_unit, location_name, address, \
     latitude, longitude, cover_image, images, field_values, rejection_reason, view_count, \
     like_count, comment_count, approved_at, created_at, updated_at";

/// Destination repository trait
#[async_trait]
pub trait DestinationRepository: Send + Sync {
    async fn create(&self, destination: &Destination) -> Result<Destination>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Destination>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Destination>>;

    /// Filtered, sorted page of destinations plus the total match count
    async fn list(&self, filter: &DestinationFilter, params: &ListParams) -> Result<(Vec<Destination>, i64)>;

    /// Persist editable columns and moderation state; counters are untouched
    async fn update(&self, destination: &Destination) -> Result<Destination>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based destination repository implementation
pub struct SqlxDestinationRepository {
    pool: DynDatabasePool,
}

impl SqlxDestinationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn DestinationRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_optional(&self, column: &str, value: BindValue) -> Result<Option<Destination>> {
        let sql = format!("SELECT {} FROM destinations WHERE {} = ?", DESTINATION_COLUMNS, column);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = value
                    .bind_to(sqlx::query(&sql))
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get destination")?;
                Ok(row.as_ref().map(row_to_destination_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = value
                    .bind_to_mysql(sqlx::query(&sql))
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get destination")?;
                Ok(row.as_ref().map(row_to_destination_mysql))
            }
        }
    }
}

/// Parameter of a dynamically built query
#[derive(Debug, Clone, PartialEq)]
enum BindValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl BindValue {
    fn bind_to<'q>(
        self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        match self {
            BindValue::Int(v) => query.bind(v),
            BindValue::Float(v) => query.bind(v),
            BindValue::Text(v) => query.bind(v),
        }
    }

    fn bind_to_mysql<'q>(
        self,
        query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    ) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
        match self {
            BindValue::Int(v) => query.bind(v),
            BindValue::Float(v) => query.bind(v),
            BindValue::Text(v) => query.bind(v),
        }
    }
}

/// Escape LIKE wildcards so the search text matches literally; `!` is the escape character
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

/// WHERE clause (possibly empty) and its parameters, in order
fn build_where(filter: &DestinationFilter) -> (String, Vec<BindValue>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        binds.push(BindValue::Text(status.as_str().to_string()));
    }
    if let Some(category_id) = filter.category_id {
        clauses.push("category_id = ?");
        binds.push(BindValue::Int(category_id));
    }
    if let Some(subcategory_id) = filter.subcategory_id {
        clauses.push("subcategory_id = ?");
        binds.push(BindValue::Int(subcategory_id));
    }
    if let Some(creator_id) = filter.creator_id {
        clauses.push("creator_id = ?");
        binds.push(BindValue::Int(creator_id));
    }
    if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        clauses.push(
            "(title LIKE ? ESCAPE '!' OR description LIKE ? ESCAPE '!' OR location_name LIKE ? ESCAPE '!')",
        );
        let pattern = format!("%{}%", escape_like(query));
        for _ in 0..3 {
            binds.push(BindValue::Text(pattern.clone()));
        }
    }
    if let Some(min_price) = filter.min_price {
        clauses.push("COALESCE(discount_price, price) >= ?");
        binds.push(BindValue::Float(min_price));
    }
    if let Some(max_price) = filter.max_price {
        clauses.push("COALESCE(discount_price, price) <= ?");
        binds.push(BindValue::Float(max_price));
    }

    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), binds)
    }
}

const INSERT_DESTINATION: &str = r#"
    INSERT INTO destinations (slug, title, description, category_id, subcategory_id, creator_id,
                              approver_id, status, price, discount_price, price_unit, location_name,
                              address, latitude, longitude, cover_image, images, field_values,
                              rejection_reason, approved_at, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_DESTINATION: &str = r#"
    UPDATE destinations
    SET slug = ?, title = ?, description = ?, category_id = ?, subcategory_id = ?,
        approver_id = ?, status = ?, price = ?, discount_price = ?, price_unit = ?,
        location_name = ?, address = ?, latitude = ?, longitude = ?, cover_image = ?,
        images = ?, field_values = ?, rejection_reason = ?, approved_at = ?, updated_at = ?
    WHERE id = ?
"#;

#[async_trait]
impl DestinationRepository for SqlxDestinationRepository {
    async fn create(&self, destination: &Destination) -> Result<Destination> {
        let now = Utc::now();
        let images = serde_json::to_string(&destination.images)?;
        let field_values = serde_json::to_string(&destination.field_values)?;

        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(INSERT_DESTINATION)
                .bind(&destination.slug)
                .bind(&destination.title)
                .bind(&destination.description)
                .bind(destination.category_id)
                .bind(destination.subcategory_id)
                .bind(destination.creator_id)
                .bind(destination.approver_id)
                .bind(destination.status.as_str())
                .bind(destination.price)
                .bind(destination.discount_price)
                .bind(&destination.price_unit)
                .bind(&destination.location_name)
                .bind(&destination.address)
                .bind(destination.latitude)
                .bind(destination.longitude)
                .bind(&destination.cover_image)
                .bind(&images)
                .bind(&field_values)
                .bind(&destination.rejection_reason)
                .bind(destination.approved_at)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create destination")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_DESTINATION)
                .bind(&destination.slug)
                .bind(&destination.title)
                .bind(&destination.description)
                .bind(destination.category_id)
                .bind(destination.subcategory_id)
                .bind(destination.creator_id)
                .bind(destination.approver_id)
                .bind(destination.status.as_str())
                .bind(destination.price)
                .bind(destination.discount_price)
                .bind(&destination.price_unit)
                .bind(&destination.location_name)
                .bind(&destination.address)
                .bind(destination.latitude)
                .bind(destination.longitude)
                .bind(&destination.cover_image)
                .bind(&images)
                .bind(&field_values)
                .bind(&destination.rejection_reason)
                .bind(destination.approved_at)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create destination")?
                .last_insert_id() as i64,
        };

        Ok(Destination {
            id,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
            ..destination.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Destination>> {
        self.fetch_optional("id", BindValue::Int(id)).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Destination>> {
        self.fetch_optional("slug", BindValue::Text(slug.to_string())).await
    }

    async fn list(&self, filter: &DestinationFilter, params: &ListParams) -> Result<(Vec<Destination>, i64)> {
        let (where_clause, binds) = build_where(filter);
        let count_sql = format!("SELECT COUNT(*) AS count FROM destinations{}", where_clause);
        let list_sql = format!(
            "SELECT {} FROM destinations{} ORDER BY {} LIMIT ? OFFSET ?",
            DESTINATION_COLUMNS,
            where_clause,
            filter.sort.order_by()
        );

        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut count_query = sqlx::query(&count_sql);
                let mut list_query = sqlx::query(&list_sql);
                for value in &binds {
                    count_query = value.clone().bind_to(count_query);
                    list_query = value.clone().bind_to(list_query);
                }
                let total: i64 = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count destinations")?
                    .get("count");
                let rows = list_query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list destinations")?;
                Ok((rows.iter().map(row_to_destination_sqlite).collect(), total))
            }
            Backend::Mysql(pool) => {
                let mut count_query = sqlx::query(&count_sql);
                let mut list_query = sqlx::query(&list_sql);
                for value in &binds {
                    count_query = value.clone().bind_to_mysql(count_query);
                    list_query = value.clone().bind_to_mysql(list_query);
                }
                let total: i64 = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count destinations")?
                    .get("count");
                let rows = list_query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list destinations")?;
                Ok((rows.iter().map(row_to_destination_mysql).collect(), total))
            }
        }
    }

    async fn update(&self, destination: &Destination) -> Result<Destination> {
        let now = Utc::now();
        let images = serde_json::to_string(&destination.images)?;
        let field_values = serde_json::to_string(&destination.field_values)?;

        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(UPDATE_DESTINATION)
                    .bind(&destination.slug)
                    .bind(&destination.title)
                    .bind(&destination.description)
                    .bind(destination.category_id)
                    .bind(destination.subcategory_id)
                    .bind(destination.approver_id)
                    .bind(destination.status.as_str())
                    .bind(destination.price)
                    .bind(destination.discount_price)
                    .bind(&destination.price_unit)
                    .bind(&destination.location_name)
                    .bind(&destination.address)
                    .bind(destination.latitude)
                    .bind(destination.longitude)
                    .bind(&destination.cover_image)
                    .bind(&images)
                    .bind(&field_values)
                    .bind(&destination.rejection_reason)
                    .bind(destination.approved_at)
                    .bind(now)
                    .bind(destination.id)
                    .execute(pool)
                    .await
                    .context("Failed to update destination")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(UPDATE_DESTINATION)
                    .bind(&destination.slug)
                    .bind(&destination.title)
                    .bind(&destination.description)
                    .bind(destination.category_id)
                    .bind(destination.subcategory_id)
                    .bind(destination.approver_id)
                    .bind(destination.status.as_str())
                    .bind(destination.price)
                    .bind(destination.discount_price)
                    .bind(&destination.price_unit)
                    .bind(&destination.location_name)
                    .bind(&destination.address)
                    .bind(destination.latitude)
                    .bind(destination.longitude)
                    .bind(&destination.cover_image)
                    .bind(&images)
                    .bind(&field_values)
                    .bind(&destination.rejection_reason)
                    .bind(destination.approved_at)
                    .bind(now)
                    .bind(destination.id)
                    .execute(pool)
                    .await
                    .context("Failed to update destination")?;
            }
        }

        self.get_by_id(destination.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Destination not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM destinations WHERE id = ?";
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(sql).bind(id).execute(pool).await.context("Failed to delete destination")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql).bind(id).execute(pool).await.context("Failed to delete destination")?;
            }
        }
        Ok(())
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM destinations WHERE slug = ?";
        let count: i64 = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(slug)
                .fetch_one(pool)
                .await
                .context("Failed to check slug")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(slug)
                .fetch_one(pool)
                .await
                .context("Failed to check slug")?
                .get("count"),
        };
        Ok(count > 0)
    }
}

fn parse_images(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn parse_field_values(raw: &str) -> serde_json::Map<String, serde_json::Value> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn row_to_destination_sqlite(row: &sqlx::sqlite::SqliteRow) -> Destination {
    let status: String = row.get("status");
    let images: String = row.get("images");
    let field_values: String = row.get("field_values");
    Destination {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        category_id: row.get("category_id"),
        subcategory_id: row.get("subcategory_id"),
        creator_id: row.get("creator_id"),
        approver_id: row.get("approver_id"),
        status: status.parse().unwrap_or_default(),
        price: row.get("price"),
        discount_price: row.get("discount_price"),
        price_unit: row.get("price_unit"),
        location_name: row.get("location_name"),
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        cover_image: row.get("cover_image"),
        images: parse_images(&images),
        field_values: parse_field_values(&field_values),
        rejection_reason: row.get("rejection_reason"),
        view_count: row.get("view_count"),
        like_count: row.get("like_count"),
        comment_count: row.get("comment_count"),
        approved_at: row.get("approved_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_destination_mysql(row: &sqlx::mysql::MySqlRow) -> Destination {
    let status: String = row.get("status");
    let images: String = row.get("images");
    let field_values: String = row.get("field_values");
    Destination {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        category_id: row.get("category_id"),
        subcategory_id: row.get("subcategory_id"),
        creator_id: row.get("creator_id"),
        approver_id: row.get("approver_id"),
        status: status.parse().unwrap_or_default(),
        price: row.get("price"),
        discount_price: row.get("discount_price"),
        price_unit: row.get("price_unit"),
        location_name: row.get("location_name"),
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        cover_image: row.get("cover_image"),
        images: parse_images(&images),
        field_values: parse_field_values(&field_values),
        rejection_reason: row.get("rejection_reason"),
        view_count: row.get("view_count"),
        like_count: row.get("like_count"),
        comment_count: row.get("comment_count"),
        approved_at: row.get("approved_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CategoryRepository, SqlxCategoryRepository, SqlxSubcategoryRepository, SqlxUserRepository,
        SubcategoryRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, DestinationSort, DestinationStatus, Subcategory, User, UserRole};
    use serde_json::json;

    struct Fixture {
        repo: SqlxDestinationRepository,
        provider: i64,
        other_provider: i64,
        beach: i64,
        mountain: i64,
        surf: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let provider = users
            .create(&User::new("a".into(), "a@x.io".into(), "h".into(), UserRole::ServiceProvider))
            .await
            .unwrap();
        let other_provider = users
            .create(&User::new("b".into(), "b@x.io".into(), "h".into(), UserRole::ServiceProvider))
            .await
            .unwrap();

        let categories = SqlxCategoryRepository::new(pool.clone());
        let beach = categories
            .create(&Category::new("beach".into(), "Beach".into(), None, 0))
            .await
            .unwrap();
        let mountain = categories
            .create(&Category::new("mountain".into(), "Mountain".into(), None, 1))
            .await
            .unwrap();
        let surf = SqlxSubcategoryRepository::new(pool.clone())
            .create(&Subcategory::new(beach.id, "surf".into(), "Surf".into(), None, 0))
            .await
            .unwrap();

        Fixture {
            repo: SqlxDestinationRepository::new(pool),
            provider: provider.id,
            other_provider: other_provider.id,
            beach: beach.id,
            mountain: mountain.id,
            surf: surf.id,
        }
    }

    fn destination(slug: &str, category_id: i64, creator_id: i64, price: f64) -> Destination {
        let mut destination = Destination::new(
            slug.to_string(),
            slug.replace('-', " "),
            format!("About {}", slug),
            category_id,
            creator_id,
        );
        destination.price = price;
        destination
    }

    #[tokio::test]
    async fn test_create_and_get_round_trips_json_columns() {
        let f = setup().await;
        let mut input = destination("bali-surf-camp", f.beach, f.provider, 120.0);
        input.subcategory_id = Some(f.surf);
        input.images = vec!["/uploads/a.jpg".into(), "/uploads/b.jpg".into()];
        input.field_values = json!({"board_rental": true, "level": "beginner"})
            .as_object()
            .cloned()
            .unwrap();
        input.latitude = Some(-8.65);
        input.longitude = Some(115.13);

        let created = f.repo.create(&input).await.unwrap();
        let loaded = f.repo.get_by_slug("bali-surf-camp").await.unwrap().unwrap();

        assert_eq!(loaded.id, created.id);
        assert_eq!(loaded.status, DestinationStatus::Pending);
        assert_eq!(loaded.images.len(), 2);
        assert_eq!(loaded.field_values["level"], "beginner");
        assert_eq!(loaded.subcategory_id, Some(f.surf));
        assert_eq!(loaded.latitude, Some(-8.65));
        assert!(f.repo.exists_by_slug("bali-surf-camp").await.unwrap());
        assert!(!f.repo.exists_by_slug("nowhere").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_by_status_category_and_creator() {
        let f = setup().await;
        let mut approved = destination("one", f.beach, f.provider, 10.0);
        approved.mark_approved(f.provider);
        f.repo.create(&approved).await.unwrap();
        f.repo.create(&destination("two", f.beach, f.provider, 20.0)).await.unwrap();
        f.repo
            .create(&destination("three", f.mountain, f.other_provider, 30.0))
            .await
            .unwrap();

        let params = ListParams::default();
        let (public, total) = f.repo.list(&DestinationFilter::public(), &params).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(public[0].slug, "one");

        let beach = DestinationFilter {
            category_id: Some(f.beach),
            ..DestinationFilter::default()
        };
        assert_eq!(f.repo.list(&beach, &params).await.unwrap().1, 2);

        let (mine, _) = f
            .repo
            .list(&DestinationFilter::by_creator(f.other_provider), &params)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].slug, "three");
    }

    #[tokio::test]
    async fn test_list_price_range_uses_discount_and_sorts() {
        let f = setup().await;
        let mut discounted = destination("discounted", f.beach, f.provider, 200.0);
        discounted.discount_price = Some(50.0);
        f.repo.create(&discounted).await.unwrap();
        f.repo.create(&destination("cheap", f.beach, f.provider, 40.0)).await.unwrap();
        f.repo.create(&destination("pricey", f.beach, f.provider, 300.0)).await.unwrap();

        let filter = DestinationFilter {
            max_price: Some(100.0),
            sort: DestinationSort::PriceDesc,
            ..DestinationFilter::default()
        };
        let (items, total) = f.repo.list(&filter, &ListParams::default()).await.unwrap();

        assert_eq!(total, 2);
        let slugs: Vec<&str> = items.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(slugs, vec!["discounted", "cheap"]);
    }

    #[tokio::test]
    async fn test_list_text_search_and_pagination() {
        let f = setup().await;
        for i in 0..5 {
            let mut d = destination(&format!("lagoon-{}", i), f.beach, f.provider, 10.0);
            d.location_name = Some("Blue Lagoon".into());
            f.repo.create(&d).await.unwrap();
        }
        f.repo.create(&destination("summit", f.mountain, f.provider, 10.0)).await.unwrap();

        let filter = DestinationFilter {
            query: Some("lagoon".into()),
            ..DestinationFilter::default()
        };
        let (page, total) = f.repo.list(&filter, &ListParams::new(2, 2)).await.unwrap();

        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_text_search_treats_wildcards_literally() {
        let f = setup().await;
        let titles = [("deal-pct", "Deal 50% off"), ("deal-500", "Deal 500 off"), ("snake", "reef_camp"), ("plain", "reefxcamp")];
        for (slug, title) in titles {
            let mut d = destination(slug, f.beach, f.provider, 10.0);
            d.title = title.to_string();
            f.repo.create(&d).await.unwrap();
        }

        for (query, expected) in [("50%", "deal-pct"), ("reef_camp", "snake")] {
            let filter = DestinationFilter {
                query: Some(query.into()),
                ..DestinationFilter::default()
            };
            let (items, total) = f.repo.list(&filter, &ListParams::default()).await.unwrap();
            assert_eq!(total, 1, "query {}", query);
            assert_eq!(items[0].slug, expected);
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%"), "50!%");
        assert_eq!(escape_like("a_b!"), "a!_b!!");
        assert_eq!(escape_like("lagoon"), "lagoon");
    }

    #[tokio::test]
    async fn test_update_moderation_state() {
        let f = setup().await;
        let mut created = f
            .repo
            .create(&destination("coast", f.beach, f.provider, 10.0))
            .await
            .unwrap();

        created.mark_rejected("Missing photos".into());
        let rejected = f.repo.update(&created).await.unwrap();
        assert_eq!(rejected.status, DestinationStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Missing photos"));

        created.mark_approved(f.other_provider);
        let approved = f.repo.update(&created).await.unwrap();
        assert!(approved.is_approved());
        assert!(approved.approved_at.is_some());
        assert!(approved.rejection_reason.is_none());

        f.repo.delete(created.id).await.unwrap();
        assert!(f.repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[test]
    fn test_build_where_without_filters_is_empty() {
        let (clause, binds) = build_where(&DestinationFilter::default());
        assert!(clause.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn test_build_where_ignores_blank_query() {
        let filter = DestinationFilter {
            query: Some("   ".into()),
            min_price: Some(5.0),
            ..DestinationFilter::default()
        };
        let (clause, binds) = build_where(&filter);
        assert_eq!(clause, " WHERE COALESCE(discount_price, price) >= ?");
        assert_eq!(binds, vec![BindValue::Float(5.0)]);
    }
}
