//! Destination service
//!
//! Submission, editing and moderation of destinations:
//! - providers submit into their assigned categories; submissions start `pending`
//! - admin submissions are approved on creation
//! - admins approve or reject; a provider edit sends the destination back to review
//! - only approved destinations are public, owners and admins see the rest
//!
//! Category-specific attributes are validated by the form engine.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{
    CategoryRepository, DestinationRepository, SubcategoryRepository, UserRepository,
};
use crate::models::{
    Destination, DestinationDetail, DestinationFilter, DestinationStatus, ListParams, PagedResult,
    ProviderContact, User,
};
use crate::services::assignment::{AssignmentService, AssignmentServiceError};
use crate::services::form::{FieldError, FormService, FormServiceError};
use crate::services::landing::CACHE_KEY_LANDING;
use crate::services::slug::{generate_slug, with_suffix};
use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const TITLE_MAX_LENGTH: usize = 200;
const MAX_IMAGES: usize = 30;
const REASON_MAX_LENGTH: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum DestinationServiceError {
    #[error("Destination not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad input or an illegal status transition
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Category form values failed validation
    #[error("Invalid form values")]
    InvalidValues(Vec<FieldError>),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FormServiceError> for DestinationServiceError {
    fn from(err: FormServiceError) -> Self {
        match err {
            FormServiceError::InvalidValues(errors) => DestinationServiceError::InvalidValues(errors),
            FormServiceError::CategoryNotFound(id) => {
                DestinationServiceError::ValidationError(format!("Category {} does not exist", id))
            }
            FormServiceError::InternalError(e) => DestinationServiceError::InternalError(e),
            other => DestinationServiceError::ValidationError(other.to_string()),
        }
    }
}

impl From<AssignmentServiceError> for DestinationServiceError {
    fn from(err: AssignmentServiceError) -> Self {
        match err {
            AssignmentServiceError::InternalError(e) => DestinationServiceError::InternalError(e),
            other => DestinationServiceError::ValidationError(other.to_string()),
        }
    }
}

/// Submitted destination; an update replaces every editable member
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category_id: i64,
    #[serde(default)]
    pub subcategory_id: Option<i64>,
    /// Generated from the title when absent
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount_price: Option<f64>,
    #[serde(default)]
    pub price_unit: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub field_values: Map<String, Value>,
}

impl DestinationInput {
    pub fn new(title: impl Into<String>, category_id: i64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category_id,
            subcategory_id: None,
            slug: None,
            price: 0.0,
            discount_price: None,
            price_unit: None,
            location_name: None,
            address: None,
            latitude: None,
            longitude: None,
            cover_image: None,
            images: Vec::new(),
            field_values: Map::new(),
        }
    }

    pub fn with_subcategory(mut self, subcategory_id: i64) -> Self {
        self.subcategory_id = Some(subcategory_id);
        self
    }

    pub fn with_price(mut self, price: f64, discount_price: Option<f64>) -> Self {
        self.price = price;
        self.discount_price = discount_price;
        self
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.field_values.insert(name.to_string(), value);
        self
    }
}

/// Checks that need no database access
pub fn validate_input(input: &DestinationInput) -> Result<(), String> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err("Title cannot be empty".to_string());
    }
    if title.chars().count() > TITLE_MAX_LENGTH {
        return Err(format!("Title cannot exceed {} characters", TITLE_MAX_LENGTH));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err("Price must be zero or more".to_string());
    }
    if let Some(discount) = input.discount_price {
        if !discount.is_finite() || discount < 0.0 || discount > input.price {
            return Err("Discount price must be between 0 and the price".to_string());
        }
    }
    if let Some(lat) = input.latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err("Latitude must be between -90 and 90".to_string());
        }
    }
    if let Some(lng) = input.longitude {
        if !(-180.0..=180.0).contains(&lng) {
            return Err("Longitude must be between -180 and 180".to_string());
        }
    }
    if input.images.len() > MAX_IMAGES {
        return Err(format!("At most {} images are allowed", MAX_IMAGES));
    }
    Ok(())
}

pub struct DestinationService {
    repo: Arc<dyn DestinationRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    subcategory_repo: Arc<dyn SubcategoryRepository>,
    user_repo: Arc<dyn UserRepository>,
    assignments: Arc<AssignmentService>,
    forms: Arc<FormService>,
    cache: Arc<Cache>,
}

impl DestinationService {
    pub fn new(
        repo: Arc<dyn DestinationRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        subcategory_repo: Arc<dyn SubcategoryRepository>,
        user_repo: Arc<dyn UserRepository>,
        assignments: Arc<AssignmentService>,
        forms: Arc<FormService>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            category_repo,
            subcategory_repo,
            user_repo,
            assignments,
            forms,
            cache,
        }
    }

    /// Submit a destination.
    ///
    /// Provider submissions start `pending`; admin submissions are approved
    /// with the admin as approver.
    pub async fn create(&self, actor: &User, input: DestinationInput) -> Result<Destination, DestinationServiceError> {
        if !actor.can_submit_destinations() {
            return Err(DestinationServiceError::Forbidden(
                "Only service providers and admins can submit destinations".to_string(),
            ));
        }

        let field_values = self.validate(actor, &input).await?;
        let base = input.slug.as_deref().unwrap_or(&input.title);
        let slug = self.unique_slug(base, None).await?;

        let mut destination = Destination::new(
            slug,
            input.title.trim().to_string(),
            input.description.trim().to_string(),
            input.category_id,
            actor.id,
        );
        apply_input(&mut destination, input, field_values);
        if actor.is_admin() {
            destination.mark_approved(actor.id);
        }

        let created = self.repo.create(&destination).await.context("Failed to create destination")?;

        tracing::info!(
            "Destination created: {} by {} ({})",
            created.slug,
            actor.username,
            created.status
        );
        Ok(created)
    }

    /// Replace a destination's content; owner or admin only.
    ///
    /// An owner edit of an approved or rejected destination moves it back
    /// to `pending`.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: DestinationInput,
    ) -> Result<Destination, DestinationServiceError> {
        let mut destination = self.require(id).await?;
        if !actor.can_manage(destination.creator_id) {
            return Err(DestinationServiceError::Forbidden(
                "You can only edit your own destinations".to_string(),
            ));
        }

        let field_values = self.validate(actor, &input).await?;
        if let Some(ref slug) = input.slug {
            destination.slug = self.unique_slug(slug, Some(&destination)).await?;
        }
        destination.title = input.title.trim().to_string();
        destination.description = input.description.trim().to_string();
        destination.category_id = input.category_id;
        apply_input(&mut destination, input, field_values);

        if !actor.is_admin() && destination.status != DestinationStatus::Pending {
            destination.mark_pending();
        }

        let updated = self.repo.update(&destination).await.context("Failed to update destination")?;
        Ok(updated)
    }

    /// Delete a destination; owner or admin only
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), DestinationServiceError> {
        let destination = self.require(id).await?;
        if !actor.can_manage(destination.creator_id) {
            return Err(DestinationServiceError::Forbidden(
                "You can only delete your own destinations".to_string(),
            ));
        }

        self.repo.delete(id).await.context("Failed to delete destination")?;
        // Experience cards pointing at it were detached by the database
        let _ = self.cache.delete(CACHE_KEY_LANDING).await;

        tracing::info!("Destination deleted: {} by {}", destination.slug, actor.username);
        Ok(())
    }

    pub async fn approve(&self, admin: &User, id: i64) -> Result<Destination, DestinationServiceError> {
        let mut destination = self.require(id).await?;
        if !destination.status.can_approve() {
            return Err(DestinationServiceError::ValidationError(format!(
                "Cannot approve a destination that is {}",
                destination.status
            )));
        }

        destination.mark_approved(admin.id);
        let updated = self.repo.update(&destination).await.context("Failed to approve destination")?;

        tracing::info!("Destination approved: {} by {}", updated.slug, admin.username);
        Ok(updated)
    }

    pub async fn reject(&self, admin: &User, id: i64, reason: &str) -> Result<Destination, DestinationServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DestinationServiceError::ValidationError(
                "A rejection reason is required".to_string(),
            ));
        }
        if reason.chars().count() > REASON_MAX_LENGTH {
            return Err(DestinationServiceError::ValidationError(format!(
                "Rejection reason cannot exceed {} characters",
                REASON_MAX_LENGTH
            )));
        }

        let mut destination = self.require(id).await?;
        if !destination.status.can_reject() {
            return Err(DestinationServiceError::ValidationError(format!(
                "Cannot reject a destination that is {}",
                destination.status
            )));
        }

        destination.mark_rejected(reason.to_string());
        let updated = self.repo.update(&destination).await.context("Failed to reject destination")?;

        tracing::info!("Destination rejected: {} by {}", updated.slug, admin.username);
        Ok(updated)
    }

    /// Look up by numeric id, falling back to slug
    pub async fn find(&self, key: &str) -> Result<Option<Destination>, DestinationServiceError> {
        if let Ok(id) = key.parse::<i64>() {
            if let Some(destination) = self.repo.get_by_id(id).await.context("Failed to get destination")? {
                return Ok(Some(destination));
            }
        }
        self.repo
            .get_by_slug(key)
            .await
            .context("Failed to get destination by slug")
            .map_err(Into::into)
    }

    /// A destination the viewer may see.
    ///
    /// Hidden destinations report `NotFound` rather than `Forbidden`.
    pub async fn get_visible(&self, key: &str, viewer: Option<&User>) -> Result<Destination, DestinationServiceError> {
        self.find(key)
            .await?
            .filter(|d| d.is_visible_to(viewer))
            .ok_or_else(|| DestinationServiceError::NotFound(key.to_string()))
    }

    /// Destination page: the destination with its category, subcategory and provider contact
    pub async fn detail(&self, key: &str, viewer: Option<&User>) -> Result<DestinationDetail, DestinationServiceError> {
        let destination = self.get_visible(key, viewer).await?;

        let category = self
            .category_repo
            .get_by_id(destination.category_id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| anyhow::anyhow!("Destination {} has no category", destination.id))?;
        let subcategory = match destination.subcategory_id {
            Some(id) => self.subcategory_repo.get_by_id(id).await.context("Failed to get subcategory")?,
            None => None,
        };
        let provider = self
            .user_repo
            .get_by_id(destination.creator_id)
            .await
            .context("Failed to get provider")?
            .as_ref()
            .map(ProviderContact::from);

        Ok(DestinationDetail {
            destination,
            category,
            subcategory,
            provider,
        })
    }

    /// Public catalog; the status filter is forced to approved
    pub async fn list_public(
        &self,
        filter: DestinationFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Destination>, DestinationServiceError> {
        let filter = DestinationFilter {
            status: Some(DestinationStatus::Approved),
            creator_id: None,
            ..filter
        };
        self.list(&filter, params).await
    }

    /// A provider's own destinations, in any status
    pub async fn list_own(
        &self,
        provider: &User,
        status: Option<DestinationStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Destination>, DestinationServiceError> {
        let filter = DestinationFilter {
            status,
            ..DestinationFilter::by_creator(provider.id)
        };
        self.list(&filter, params).await
    }

    /// Unrestricted listing for the moderation queue
    pub async fn list(
        &self,
        filter: &DestinationFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Destination>, DestinationServiceError> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(DestinationServiceError::ValidationError(
                    "min_price cannot be greater than max_price".to_string(),
                ));
            }
        }

        let (items, total) = self
            .repo
            .list(filter, params)
            .await
            .context("Failed to list destinations")?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn require(&self, id: i64) -> Result<Destination, DestinationServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get destination")?
            .ok_or_else(|| DestinationServiceError::NotFound(id.to_string()))
    }

    /// Full input validation, returning the normalized field values
    async fn validate(
        &self,
        actor: &User,
        input: &DestinationInput,
    ) -> Result<Map<String, Value>, DestinationServiceError> {
        validate_input(input).map_err(DestinationServiceError::ValidationError)?;

        if self
            .category_repo
            .get_by_id(input.category_id)
            .await
            .context("Failed to get category")?
            .is_none()
        {
            return Err(DestinationServiceError::ValidationError(format!(
                "Category {} does not exist",
                input.category_id
            )));
        }

        if let Some(subcategory_id) = input.subcategory_id {
            let belongs = self
                .subcategory_repo
                .get_by_id(subcategory_id)
                .await
                .context("Failed to get subcategory")?
                .is_some_and(|sub| sub.belongs_to(input.category_id));
            if !belongs {
                return Err(DestinationServiceError::ValidationError(format!(
                    "Subcategory {} does not belong to category {}",
                    subcategory_id, input.category_id
                )));
            }
        }

        if !actor.is_admin()
            && !self
                .assignments
                .can_submit(actor.id, input.category_id, input.subcategory_id)
                .await?
        {
            return Err(DestinationServiceError::Forbidden(
                "You are not assigned to this category".to_string(),
            ));
        }

        let values = self
            .forms
            .validate_submission(input.category_id, &input.field_values)
            .await?;
        Ok(values)
    }

    /// First free slug among `base`, `base-2`, `base-3`, ...
    ///
    /// `current` keeps a destination's own slug available to it.
    async fn unique_slug(&self, base: &str, current: Option<&Destination>) -> Result<String, DestinationServiceError> {
        let base = generate_slug(base);
        if base.is_empty() {
            return Err(DestinationServiceError::ValidationError(
                "Slug must contain at least one letter or digit".to_string(),
            ));
        }

        let mut n = 1;
        loop {
            let candidate = with_suffix(&base, n);
            if current.is_some_and(|d| d.slug == candidate) {
                return Ok(candidate);
            }
            if !self
                .repo
                .exists_by_slug(&candidate)
                .await
                .context("Failed to check slug uniqueness")?
            {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

/// Copy the optional members of an input onto a destination
fn apply_input(destination: &mut Destination, input: DestinationInput, field_values: Map<String, Value>) {
    destination.subcategory_id = input.subcategory_id;
    destination.price = input.price;
    destination.discount_price = input.discount_price;
    destination.price_unit = non_empty(input.price_unit);
    destination.location_name = non_empty(input.location_name);
    destination.address = non_empty(input.address);
    destination.latitude = input.latitude;
    destination.longitude = input.longitude;
    destination.cover_image = non_empty(input.cover_image);
    destination.images = input
        .images
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();
    destination.field_values = field_values;
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{
        SqlxAssignmentRepository, SqlxCategoryRepository, SqlxDestinationRepository,
        SqlxFormFieldRepository, SqlxLandingRepository, SqlxSubcategoryRepository,
        SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{AssignmentEntry, Category, ExperienceCard, FieldType, Subcategory, UserRole};
    use crate::services::form::CreateFieldInput;
    use crate::services::landing::{LandingInput, LandingService};
    use serde_json::json;

    struct Fixture {
        service: DestinationService,
        forms: Arc<FormService>,
        landing: LandingService,
        admin: User,
        provider: User,
        other_provider: User,
        tourist: User,
        beach: Category,
        mountain: Category,
        surf: Subcategory,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let subcategories = SqlxSubcategoryRepository::boxed(pool.clone());
        let cache = create_cache(&CacheConfig::default()).unwrap();

        let mk = |name: &str, role| User::new(name.into(), format!("{}@x.io", name), "h".into(), role);
        let admin = users.create(&mk("root", UserRole::Admin)).await.unwrap();
        let provider = users.create(&mk("guide", UserRole::ServiceProvider)).await.unwrap();
        let other_provider = users.create(&mk("rival", UserRole::ServiceProvider)).await.unwrap();
        let tourist = users.create(&mk("tourist", UserRole::User)).await.unwrap();

        let beach = categories
            .create(&Category::new("beach".into(), "Beach".into(), None, 0))
            .await
            .unwrap();
        let mountain = categories
            .create(&Category::new("mountain".into(), "Mountain".into(), None, 1))
            .await
            .unwrap();
        let surf = subcategories
            .create(&Subcategory::new(beach.id, "surf".into(), "Surf".into(), None, 0))
            .await
            .unwrap();

        let assignments = Arc::new(AssignmentService::new(
            SqlxAssignmentRepository::boxed(pool.clone()),
            users.clone(),
            categories.clone(),
            subcategories.clone(),
        ));
        assignments
            .set_assignments(provider.id, vec![AssignmentEntry::whole_category(beach.id)])
            .await
            .unwrap();
        assignments
            .set_assignments(other_provider.id, vec![AssignmentEntry::whole_category(beach.id)])
            .await
            .unwrap();

        let forms = Arc::new(FormService::new(
            SqlxFormFieldRepository::boxed(pool.clone()),
            categories.clone(),
            cache.clone(),
        ));

        let destination_repo = SqlxDestinationRepository::boxed(pool.clone());
        let landing = LandingService::new(
            SqlxLandingRepository::boxed(pool.clone()),
            destination_repo.clone(),
            cache.clone(),
        );
        let service = DestinationService::new(
            destination_repo,
            categories,
            subcategories,
            users,
            assignments,
            forms.clone(),
            cache,
        );

        Fixture {
            service,
            forms,
            landing,
            admin,
            provider,
            other_provider,
            tourist,
            beach,
            mountain,
            surf,
        }
    }

    #[test]
    fn test_validate_input_rules() {
        assert!(validate_input(&DestinationInput::new("Kuta", 1)).is_ok());
        assert!(validate_input(&DestinationInput::new("  ", 1)).is_err());
        assert!(validate_input(&DestinationInput::new("Kuta", 1).with_price(-1.0, None)).is_err());
        assert!(validate_input(&DestinationInput::new("Kuta", 1).with_price(100.0, Some(100.0))).is_ok());
        assert!(validate_input(&DestinationInput::new("Kuta", 1).with_price(100.0, Some(120.0))).is_err());

        let mut input = DestinationInput::new("Kuta", 1);
        input.latitude = Some(91.0);
        assert!(validate_input(&input).is_err());
        input.latitude = Some(-8.7);
        input.longitude = Some(-181.0);
        assert!(validate_input(&input).is_err());
        input.longitude = Some(115.2);
        assert!(validate_input(&input).is_ok());
    }

    #[tokio::test]
    async fn test_provider_submission_starts_pending() {
        let f = setup().await;

        let destination = f
            .service
            .create(&f.provider, DestinationInput::new("Kuta Beach", f.beach.id).with_subcategory(f.surf.id))
            .await
            .unwrap();

        assert_eq!(destination.status, DestinationStatus::Pending);
        assert_eq!(destination.slug, "kuta-beach");
        assert_eq!(destination.creator_id, f.provider.id);
        assert!(destination.approver_id.is_none());
    }

    #[tokio::test]
    async fn test_admin_submission_is_approved() {
        let f = setup().await;

        let destination = f
            .service
            .create(&f.admin, DestinationInput::new("Rinjani", f.mountain.id))
            .await
            .unwrap();

        assert_eq!(destination.status, DestinationStatus::Approved);
        assert_eq!(destination.approver_id, Some(f.admin.id));
        assert!(destination.approved_at.is_some());
    }

    #[tokio::test]
    async fn test_submission_requires_assignment_and_role() {
        let f = setup().await;

        let unassigned = f
            .service
            .create(&f.provider, DestinationInput::new("Rinjani", f.mountain.id))
            .await;
        assert!(matches!(unassigned, Err(DestinationServiceError::Forbidden(_))));

        let tourist = f
            .service
            .create(&f.tourist, DestinationInput::new("Kuta", f.beach.id))
            .await;
        assert!(matches!(tourist, Err(DestinationServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_subcategory_must_belong_to_category() {
        let f = setup().await;

        let result = f
            .service
            .create(&f.admin, DestinationInput::new("Rinjani", f.mountain.id).with_subcategory(f.surf.id))
            .await;

        assert!(matches!(result, Err(DestinationServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_duplicate_titles_get_suffixed_slugs() {
        let f = setup().await;

        let first = f.service.create(&f.provider, DestinationInput::new("Kuta", f.beach.id)).await.unwrap();
        let second = f.service.create(&f.provider, DestinationInput::new("Kuta", f.beach.id)).await.unwrap();
        let third = f.service.create(&f.provider, DestinationInput::new("Kuta", f.beach.id)).await.unwrap();

        assert_eq!(first.slug, "kuta");
        assert_eq!(second.slug, "kuta-2");
        assert_eq!(third.slug, "kuta-3");
    }

    #[tokio::test]
    async fn test_field_values_are_validated() {
        let f = setup().await;
        f.forms
            .create_field(
                f.beach.id,
                CreateFieldInput::new("wave_height", "Wave height", FieldType::Number).required(),
            )
            .await
            .unwrap();

        let missing = f
            .service
            .create(&f.provider, DestinationInput::new("Kuta", f.beach.id))
            .await;
        match missing {
            Err(DestinationServiceError::InvalidValues(errors)) => {
                assert_eq!(errors[0].field, "wave_height")
            }
            other => panic!("expected invalid values, got {:?}", other),
        }

        let ok = f
            .service
            .create(
                &f.provider,
                DestinationInput::new("Kuta", f.beach.id)
                    .with_field("wave_height", json!("2.5"))
                    .with_field("unknown", json!(true)),
            )
            .await
            .unwrap();
        assert_eq!(ok.field_values.len(), 1);
        assert_eq!(ok.field_values["wave_height"].as_f64(), Some(2.5));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let f = setup().await;
        let d = f.service.create(&f.provider, DestinationInput::new("Kuta", f.beach.id)).await.unwrap();

        let approved = f.service.approve(&f.admin, d.id).await.unwrap();
        assert_eq!(approved.status, DestinationStatus::Approved);
        assert_eq!(approved.approver_id, Some(f.admin.id));

        // approved -> approved is not a transition
        assert!(matches!(
            f.service.approve(&f.admin, d.id).await,
            Err(DestinationServiceError::ValidationError(_))
        ));

        let rejected = f.service.reject(&f.admin, d.id, "Blurry photos").await.unwrap();
        assert_eq!(rejected.status, DestinationStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Blurry photos"));
        assert!(rejected.approved_at.is_none());

        assert!(matches!(
            f.service.reject(&f.admin, d.id, "again").await,
            Err(DestinationServiceError::ValidationError(_))
        ));

        let reapproved = f.service.approve(&f.admin, d.id).await.unwrap();
        assert!(reapproved.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let f = setup().await;
        let d = f.service.create(&f.provider, DestinationInput::new("Kuta", f.beach.id)).await.unwrap();

        let result = f.service.reject(&f.admin, d.id, "   ").await;
        assert!(matches!(result, Err(DestinationServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_provider_edit_returns_to_pending() {
        let f = setup().await;
        let d = f.service.create(&f.provider, DestinationInput::new("Kuta", f.beach.id)).await.unwrap();
        f.service.approve(&f.admin, d.id).await.unwrap();

        let edited = f
            .service
            .update(&f.provider, d.id, DestinationInput::new("Kuta Reef", f.beach.id).with_price(50.0, None))
            .await
            .unwrap();

        assert_eq!(edited.status, DestinationStatus::Pending);
        assert!(edited.approver_id.is_none());
        assert_eq!(edited.title, "Kuta Reef");
        assert_eq!(edited.slug, "kuta");

        // Admin edits keep the status
        f.service.approve(&f.admin, d.id).await.unwrap();
        let by_admin = f
            .service
            .update(&f.admin, d.id, DestinationInput::new("Kuta Reef", f.beach.id))
            .await
            .unwrap();
        assert_eq!(by_admin.status, DestinationStatus::Approved);
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_can_edit_and_delete() {
        let f = setup().await;
        let d = f.service.create(&f.provider, DestinationInput::new("Kuta", f.beach.id)).await.unwrap();

        let edit = f
            .service
            .update(&f.other_provider, d.id, DestinationInput::new("Mine", f.beach.id))
            .await;
        assert!(matches!(edit, Err(DestinationServiceError::Forbidden(_))));
        assert!(matches!(
            f.service.delete(&f.other_provider, d.id).await,
            Err(DestinationServiceError::Forbidden(_))
        ));

        f.service.delete(&f.admin, d.id).await.unwrap();
        assert!(f.service.find(&d.id.to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_visibility() {
        let f = setup().await;
        let d = f.service.create(&f.provider, DestinationInput::new("Kuta", f.beach.id)).await.unwrap();

        assert!(matches!(
            f.service.get_visible("kuta", None).await,
            Err(DestinationServiceError::NotFound(_))
        ));
        assert!(f.service.get_visible("kuta", Some(&f.tourist)).await.is_err());
        assert!(f.service.get_visible("kuta", Some(&f.provider)).await.is_ok());
        assert!(f.service.get_visible(&d.id.to_string(), Some(&f.admin)).await.is_ok());

        f.service.approve(&f.admin, d.id).await.unwrap();
        let detail = f.service.detail("kuta", None).await.unwrap();
        assert_eq!(detail.category.id, f.beach.id);
        assert_eq!(detail.provider.map(|p| p.id), Some(f.provider.id));
    }

    #[tokio::test]
    async fn test_public_listing_only_shows_approved() {
        let f = setup().await;
        let a = f.service.create(&f.provider, DestinationInput::new("Kuta", f.beach.id)).await.unwrap();
        f.service.create(&f.provider, DestinationInput::new("Uluwatu", f.beach.id)).await.unwrap();
        f.service.approve(&f.admin, a.id).await.unwrap();

        let public = f
            .service
            .list_public(DestinationFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(public.total, 1);
        assert_eq!(public.items[0].id, a.id);

        let own = f.service.list_own(&f.provider, None, &ListParams::default()).await.unwrap();
        assert_eq!(own.total, 2);
        let pending = f
            .service
            .list_own(&f.provider, Some(DestinationStatus::Pending), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
    }

    #[tokio::test]
    async fn test_inverted_price_range_is_rejected() {
        let f = setup().await;
        let filter = DestinationFilter {
            min_price: Some(10.0),
            max_price: Some(5.0),
            ..DestinationFilter::default()
        };

        let result = f.service.list(&filter, &ListParams::default()).await;
        assert!(matches!(result, Err(DestinationServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_delete_refreshes_landing_cards() {
        let f = setup().await;
        let kuta = f
            .service
            .create(&f.admin, DestinationInput::new("Kuta", f.beach.id))
            .await
            .unwrap();

        let mut input = LandingInput::new("Island life");
        input.experience_cards = vec![ExperienceCard {
            id: 0,
            title: "Sunset surf".into(),
            description: None,
            image: None,
            destination_id: Some(kuta.id),
            sort_order: 0,
        }];
        f.landing.update(&f.admin, input).await.unwrap();
        // Warm the cache
        let landing = f.landing.get().await.unwrap();
        assert_eq!(landing.experience_cards[0].destination_id, Some(kuta.id));

        f.service.delete(&f.admin, kuta.id).await.unwrap();

        let landing = f.landing.get().await.unwrap();
        assert_eq!(landing.experience_cards.len(), 1);
        assert_eq!(landing.experience_cards[0].destination_id, None);
    }
}
