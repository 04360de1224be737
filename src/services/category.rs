//! Category service
//!
//! Business logic for the two-level catalog:
//! - create, update, delete categories and their subcategories
//! - name and slug uniqueness (global for categories, per category for subcategories)
//! - slug generation from names
//! - the cached public catalog (categories with their subcategories)
//!
//! A category that still owns destinations cannot be deleted.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, SubcategoryRepository};
use crate::models::{Category, CategoryWithSubcategories, Subcategory};
use crate::services::form::FORM_CACHE_PREFIX;
use crate::services::slug::generate_slug;
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Default cache TTL for the catalog (1 hour)
const CATEGORY_CACHE_TTL_SECS: u64 = 3600;

/// Cache key for the full catalog
const CACHE_KEY_CATALOG: &str = "category:catalog";

const NAME_MAX_LENGTH: usize = 100;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Name already taken (globally or within the parent category)
    #[error("Name already exists: {0}")]
    DuplicateName(String),

    /// Slug already taken (globally or within the parent category)
    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Category still owns destinations
    #[error("Category still has {0} destination(s)")]
    HasDestinations(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service for the destination catalog
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    subcategory_repo: Arc<dyn SubcategoryRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CategoryService {
    pub fn new(
        repo: Arc<dyn CategoryRepository>,
        subcategory_repo: Arc<dyn SubcategoryRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self::with_cache_ttl(
            repo,
            subcategory_repo,
            cache,
            Duration::from_secs(CATEGORY_CACHE_TTL_SECS),
        )
    }

    /// Create a category service with custom cache TTL
    pub fn with_cache_ttl(
        repo: Arc<dyn CategoryRepository>,
        subcategory_repo: Arc<dyn SubcategoryRepository>,
        cache: Arc<Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            subcategory_repo,
            cache,
            cache_ttl,
        }
    }

    /// All categories with their subcategories, in display order
    pub async fn catalog(&self) -> Result<Vec<CategoryWithSubcategories>, CategoryServiceError> {
        if let Some(catalog) = self
            .cache
            .get::<Vec<CategoryWithSubcategories>>(CACHE_KEY_CATALOG)
            .await
            .ok()
            .flatten()
        {
            return Ok(catalog);
        }

        let categories = self.repo.list().await.context("Failed to list categories")?;
        let subcategories = self
            .subcategory_repo
            .list_all()
            .await
            .context("Failed to list subcategories")?;
        let catalog = CategoryWithSubcategories::group(categories, subcategories);

        let _ = self.cache.set(CACHE_KEY_CATALOG, &catalog, self.cache_ttl).await;

        Ok(catalog)
    }

    /// Look up a category by numeric id or slug
    pub async fn resolve(&self, key: &str) -> Result<CategoryWithSubcategories, CategoryServiceError> {
        let id = key.parse::<i64>().ok();
        self.catalog()
            .await?
            .into_iter()
            .find(|entry| Some(entry.category.id) == id || entry.category.slug == key)
            .ok_or_else(|| CategoryServiceError::NotFound(format!("Category {}", key)))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Category>, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category by ID")
            .map_err(Into::into)
    }

    /// Get a category or fail with `NotFound`
    pub async fn require(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("Category with ID {} not found", id)))
    }

    /// Create a new category
    ///
    /// # Errors
    /// - `ValidationError` for an empty name or a name that yields an empty slug
    /// - `DuplicateName` / `DuplicateSlug` when either is already taken
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = validate_name(&input.name)?;
        let slug = resolve_slug(input.slug.as_deref(), &name)?;

        if self.repo.exists_by_name(&name).await.context("Failed to check name uniqueness")? {
            return Err(CategoryServiceError::DuplicateName(name));
        }
        if self.repo.exists_by_slug(&slug).await.context("Failed to check slug uniqueness")? {
            return Err(CategoryServiceError::DuplicateSlug(slug));
        }

        let mut category = Category::new(
            slug,
            name,
            non_empty(input.description),
            input.sort_order.unwrap_or(0),
        );
        category.image = non_empty(input.image);

        let created = self.repo.create(&category).await.context("Failed to create category")?;
        self.invalidate_cache().await;

        tracing::info!("Category created: {} ({})", created.name, created.slug);
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateCategoryInput) -> Result<Category, CategoryServiceError> {
        let mut category = self.require(id).await?;

        if let Some(ref new_name) = input.name {
            let new_name = validate_name(new_name)?;
            if new_name != category.name {
                if self.repo.exists_by_name(&new_name).await.context("Failed to check name uniqueness")? {
                    return Err(CategoryServiceError::DuplicateName(new_name));
                }
                category.name = new_name;
            }
        }

        if let Some(ref new_slug) = input.slug {
            let new_slug = resolve_slug(Some(new_slug), &category.name)?;
            if new_slug != category.slug {
                if self.repo.exists_by_slug(&new_slug).await.context("Failed to check slug uniqueness")? {
                    return Err(CategoryServiceError::DuplicateSlug(new_slug));
                }
                category.slug = new_slug;
            }
        }

        if let Some(description) = input.description {
            category.description = non_empty(description);
        }
        if let Some(image) = input.image {
            category.image = non_empty(image);
        }
        if let Some(sort_order) = input.sort_order {
            category.sort_order = sort_order;
        }

        let updated = self.repo.update(&category).await.context("Failed to update category")?;
        self.invalidate_cache().await;

        Ok(updated)
    }

    /// Delete a category together with its subcategories, form fields and
    /// provider assignments.
    ///
    /// # Errors
    /// - `NotFound` if the category doesn't exist
    /// - `HasDestinations` while destinations are still filed under it
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let category = self.require(id).await?;

        let destinations = self
            .repo
            .count_destinations(id)
            .await
            .context("Failed to count category destinations")?;
        if destinations > 0 {
            return Err(CategoryServiceError::HasDestinations(destinations));
        }

        self.repo.delete(id).await.context("Failed to delete category")?;
        self.invalidate_cache().await;
        let _ = self.cache.delete(&format!("{}{}", FORM_CACHE_PREFIX, id)).await;

        tracing::info!("Category deleted: {} ({})", category.name, category.slug);
        Ok(())
    }

    // ========================================================================
    // Subcategories
    // ========================================================================

    pub async fn get_subcategory(&self, id: i64) -> Result<Option<Subcategory>, CategoryServiceError> {
        self.subcategory_repo
            .get_by_id(id)
            .await
            .context("Failed to get subcategory")
            .map_err(Into::into)
    }

    pub async fn list_subcategories(&self, category_id: i64) -> Result<Vec<Subcategory>, CategoryServiceError> {
        self.require(category_id).await?;
        self.subcategory_repo
            .list_by_category(category_id)
            .await
            .context("Failed to list subcategories")
            .map_err(Into::into)
    }

    pub async fn create_subcategory(
        &self,
        category_id: i64,
        input: CreateCategoryInput,
    ) -> Result<Subcategory, CategoryServiceError> {
        self.require(category_id).await?;

        let name = validate_name(&input.name)?;
        let slug = resolve_slug(input.slug.as_deref(), &name)?;

        if self
            .subcategory_repo
            .exists_by_name(category_id, &name)
            .await
            .context("Failed to check subcategory name")?
        {
            return Err(CategoryServiceError::DuplicateName(name));
        }
        if self
            .subcategory_repo
            .exists_by_slug(category_id, &slug)
            .await
            .context("Failed to check subcategory slug")?
        {
            return Err(CategoryServiceError::DuplicateSlug(slug));
        }

        let subcategory = Subcategory::new(
            category_id,
            slug,
            name,
            non_empty(input.description),
            input.sort_order.unwrap_or(0),
        );
        let created = self
            .subcategory_repo
            .create(&subcategory)
            .await
            .context("Failed to create subcategory")?;
        self.invalidate_cache().await;

        Ok(created)
    }

    pub async fn update_subcategory(
        &self,
        id: i64,
        input: UpdateCategoryInput,
    ) -> Result<Subcategory, CategoryServiceError> {
        let mut subcategory = self
            .get_subcategory(id)
            .await?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("Subcategory with ID {} not found", id)))?;

        if let Some(ref new_name) = input.name {
            let new_name = validate_name(new_name)?;
            if new_name != subcategory.name {
                if self
                    .subcategory_repo
                    .exists_by_name(subcategory.category_id, &new_name)
                    .await
                    .context("Failed to check subcategory name")?
                {
                    return Err(CategoryServiceError::DuplicateName(new_name));
                }
                subcategory.name = new_name;
            }
        }

        if let Some(ref new_slug) = input.slug {
            let new_slug = resolve_slug(Some(new_slug), &subcategory.name)?;
            if new_slug != subcategory.slug {
                if self
                    .subcategory_repo
                    .exists_by_slug(subcategory.category_id, &new_slug)
                    .await
                    .context("Failed to check subcategory slug")?
                {
                    return Err(CategoryServiceError::DuplicateSlug(new_slug));
                }
                subcategory.slug = new_slug;
            }
        }

        if let Some(description) = input.description {
            subcategory.description = non_empty(description);
        }
        if let Some(sort_order) = input.sort_order {
            subcategory.sort_order = sort_order;
        }

        let updated = self
            .subcategory_repo
            .update(&subcategory)
            .await
            .context("Failed to update subcategory")?;
        self.invalidate_cache().await;

        Ok(updated)
    }

    /// Delete a subcategory; its destinations stay in the parent category
    pub async fn delete_subcategory(&self, id: i64) -> Result<(), CategoryServiceError> {
        if self.get_subcategory(id).await?.is_none() {
            return Err(CategoryServiceError::NotFound(format!("Subcategory with ID {} not found", id)));
        }

        self.subcategory_repo
            .delete(id)
            .await
            .context("Failed to delete subcategory")?;
        self.invalidate_cache().await;

        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete(CACHE_KEY_CATALOG).await;
    }
}

fn validate_name(name: &str) -> Result<String, CategoryServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryServiceError::ValidationError("Name cannot be empty".to_string()));
    }
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(CategoryServiceError::ValidationError(format!(
            "Name cannot exceed {} characters",
            NAME_MAX_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Normalize an explicit slug, or derive one from the name
fn resolve_slug(slug: Option<&str>, name: &str) -> Result<String, CategoryServiceError> {
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => generate_slug(slug),
        None => generate_slug(name),
    };
    if slug.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Slug must contain at least one letter or digit".to_string(),
        ));
    }
    Ok(slug)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Input for creating a category or subcategory
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    /// Generated from the name when absent
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Ignored for subcategories
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

impl CreateCategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: None,
            description: None,
            image: None,
            sort_order: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Input for updating a category or subcategory; `None` leaves a field as is.
///
/// For `description` and `image`, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image: Option<Option<String>>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

impl UpdateCategoryInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Distinguish an explicit `null` from a missing key
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
