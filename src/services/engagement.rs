//! Engagement service
//!
//! Comments, likes and view counting on destinations. Only approved
//! destinations collect engagement.

use crate::db::repositories::EngagementRepository;
use crate::models::{Comment, CommentWithAuthor, Destination, LikeStatus, ListParams, PagedResult, User, Viewer};
use crate::services::destination::{DestinationService, DestinationServiceError};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Maximum comment length in characters
pub const COMMENT_MAX_LENGTH: usize = 2000;

/// Repeat views by the same viewer inside this window are not counted
const VIEW_WINDOW_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum EngagementServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<DestinationServiceError> for EngagementServiceError {
    fn from(err: DestinationServiceError) -> Self {
        match err {
            DestinationServiceError::NotFound(key) => {
                EngagementServiceError::NotFound(format!("Destination {}", key))
            }
            DestinationServiceError::InternalError(e) => EngagementServiceError::InternalError(e),
            other => EngagementServiceError::ValidationError(other.to_string()),
        }
    }
}

/// Trim a comment and check its length
pub fn normalize_comment(content: &str) -> Result<String, String> {
    let content = content.trim();
    if content.is_empty() {
        return Err("Comment cannot be empty".to_string());
    }
    if content.chars().count() > COMMENT_MAX_LENGTH {
        return Err(format!("Comment cannot exceed {} characters", COMMENT_MAX_LENGTH));
    }
    Ok(content.to_string())
}

pub struct EngagementService {
    repo: Arc<dyn EngagementRepository>,
    destinations: Arc<DestinationService>,
}

impl EngagementService {
    pub fn new(repo: Arc<dyn EngagementRepository>, destinations: Arc<DestinationService>) -> Self {
        Self { repo, destinations }
    }

    pub async fn add_comment(
        &self,
        author: &User,
        destination_key: &str,
        content: &str,
    ) -> Result<CommentWithAuthor, EngagementServiceError> {
        let content = normalize_comment(content).map_err(EngagementServiceError::ValidationError)?;
        let destination = self.approved(destination_key, Some(author)).await?;

        let comment = self
            .repo
            .add_comment(&Comment::new(destination.id, author.id, content))
            .await
            .context("Failed to add comment")?;

        Ok(CommentWithAuthor {
            comment,
            author_username: author.username.clone(),
            author_display_name: author.display_name.clone(),
        })
    }

    /// Newest first
    pub async fn list_comments(
        &self,
        destination_key: &str,
        viewer: Option<&User>,
        params: &ListParams,
    ) -> Result<PagedResult<CommentWithAuthor>, EngagementServiceError> {
        let destination = self.destinations.get_visible(destination_key, viewer).await?;

        let (items, total) = self
            .repo
            .list_comments(destination.id, params)
            .await
            .context("Failed to list comments")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Delete a comment; its author or an admin only
    pub async fn delete_comment(&self, actor: &User, id: i64) -> Result<(), EngagementServiceError> {
        let comment = self
            .repo
            .get_comment(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| EngagementServiceError::NotFound(format!("Comment {}", id)))?;

        if !actor.can_manage(comment.user_id) {
            return Err(EngagementServiceError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.repo.delete_comment(&comment).await.context("Failed to delete comment")?;
        Ok(())
    }

    /// Like when not liked yet, unlike otherwise
    pub async fn toggle_like(&self, user: &User, destination_key: &str) -> Result<LikeStatus, EngagementServiceError> {
        let destination = self.approved(destination_key, Some(user)).await?;

        self.repo
            .toggle_like(destination.id, user.id)
            .await
            .context("Failed to toggle like")
            .map_err(Into::into)
    }

    pub async fn like_status(&self, user: &User, destination_key: &str) -> Result<LikeStatus, EngagementServiceError> {
        let destination = self.destinations.get_visible(destination_key, Some(user)).await?;

        let liked = self
            .repo
            .is_liked(destination.id, user.id)
            .await
            .context("Failed to check like")?;
        Ok(LikeStatus {
            liked,
            like_count: destination.like_count,
        })
    }

    /// Count a view unless the same viewer was seen within the last 24 hours.
    ///
    /// Views of destinations that are not approved are never counted.
    pub async fn record_view(
        &self,
        destination_key: &str,
        user: Option<&User>,
        viewer: &Viewer,
    ) -> Result<bool, EngagementServiceError> {
        let destination = self.destinations.get_visible(destination_key, user).await?;
        if !destination.is_approved() {
            return Ok(false);
        }

        let since = Utc::now() - Duration::hours(VIEW_WINDOW_HOURS);
        self.repo
            .record_view(destination.id, viewer, since)
            .await
            .context("Failed to record view")
            .map_err(Into::into)
    }

    /// Visible and approved, or `ValidationError`
    async fn approved(&self, key: &str, viewer: Option<&User>) -> Result<Destination, EngagementServiceError> {
        let destination = self.destinations.get_visible(key, viewer).await?;
        if !destination.is_approved() {
            return Err(EngagementServiceError::ValidationError(
                "Only approved destinations accept comments and likes".to_string(),
            ));
        }
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{
        CategoryRepository, SqlxAssignmentRepository, SqlxCategoryRepository,
        SqlxDestinationRepository, SqlxEngagementRepository, SqlxFormFieldRepository,
        SqlxSubcategoryRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, UserRole};
    use crate::services::assignment::AssignmentService;
    use crate::services::destination::DestinationInput;
    use crate::services::form::FormService;

    struct Fixture {
        service: EngagementService,
        destinations: Arc<DestinationService>,
        users: Arc<dyn UserRepository>,
        admin: User,
        tourist: User,
        other: User,
        approved: Destination,
        pending: Destination,
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
        let tourist = users.create(&mk("tourist", UserRole::User)).await.unwrap();
        let other = users.create(&mk("other", UserRole::User)).await.unwrap();
        let beach = categories
            .create(&Category::new("beach".into(), "Beach".into(), None, 0))
            .await
            .unwrap();

        let assignments = Arc::new(AssignmentService::new(
            SqlxAssignmentRepository::boxed(pool.clone()),
            users.clone(),
            categories.clone(),
            subcategories.clone(),
        ));
        let forms = Arc::new(FormService::new(
            SqlxFormFieldRepository::boxed(pool.clone()),
            categories.clone(),
            cache.clone(),
        ));
        let destinations = Arc::new(DestinationService::new(
            SqlxDestinationRepository::boxed(pool.clone()),
            categories,
            subcategories,
            users.clone(),
            assignments,
            forms,
            cache,
        ));

        let approved = destinations
            .create(&admin, DestinationInput::new("Kuta", beach.id))
            .await
            .unwrap();
        let pending = destinations
            .create(&admin, DestinationInput::new("Uluwatu", beach.id))
            .await
            .unwrap();
        let pending = destinations.reject(&admin, pending.id, "incomplete").await.unwrap();

        let service = EngagementService::new(SqlxEngagementRepository::boxed(pool), destinations.clone());

        Fixture {
            service,
            destinations,
            users,
            admin,
            tourist,
            other,
            approved,
            pending,
        }
    }

    #[test]
    fn test_normalize_comment() {
        assert_eq!(normalize_comment("  nice  ").unwrap(), "nice");
        assert!(normalize_comment("   ").is_err());
        assert!(normalize_comment(&"x".repeat(COMMENT_MAX_LENGTH)).is_ok());
        assert!(normalize_comment(&"x".repeat(COMMENT_MAX_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let f = setup().await;

        let comment = f.service.add_comment(&f.tourist, "kuta", " Great waves ").await.unwrap();
        assert_eq!(comment.comment.content, "Great waves");
        assert_eq!(comment.author_username, "tourist");

        let listed = f.service.list_comments("kuta", None, &ListParams::default()).await.unwrap();
        assert_eq!(listed.total, 1);

        // Only the author or an admin may delete
        assert!(matches!(
            f.service.delete_comment(&f.other, comment.comment.id).await,
            Err(EngagementServiceError::Forbidden(_))
        ));
        f.service.delete_comment(&f.admin, comment.comment.id).await.unwrap();
        assert!(matches!(
            f.service.delete_comment(&f.admin, comment.comment.id).await,
            Err(EngagementServiceError::NotFound(_))
        ));

        let destination = f.destinations.find("kuta").await.unwrap().unwrap();
        assert_eq!(destination.comment_count, 0);
    }

    #[tokio::test]
    async fn test_comments_need_approved_destination() {
        let f = setup().await;

        let hidden = f.service.add_comment(&f.tourist, &f.pending.slug, "hello").await;
        assert!(matches!(hidden, Err(EngagementServiceError::NotFound(_))));

        // Visible to the admin, but still not approved
        let not_approved = f.service.add_comment(&f.admin, &f.pending.slug, "hello").await;
        assert!(matches!(not_approved, Err(EngagementServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_toggle_like() {
        let f = setup().await;

        let liked = f.service.toggle_like(&f.tourist, "kuta").await.unwrap();
        assert_eq!(liked, LikeStatus { liked: true, like_count: 1 });
        assert!(f.service.like_status(&f.tourist, "kuta").await.unwrap().liked);
        assert!(!f.service.like_status(&f.other, "kuta").await.unwrap().liked);

        let unliked = f.service.toggle_like(&f.tourist, "kuta").await.unwrap();
        assert_eq!(unliked, LikeStatus { liked: false, like_count: 0 });
    }

    #[tokio::test]
    async fn test_views_are_deduplicated() {
        let f = setup().await;
        let anon = Viewer::identify(None, "10.0.0.1", "curl/8");

        assert!(f.service.record_view("kuta", None, &anon).await.unwrap());
        assert!(!f.service.record_view("kuta", None, &anon).await.unwrap());
        assert!(f
            .service
            .record_view("kuta", Some(&f.tourist), &Viewer::User(f.tourist.id))
            .await
            .unwrap());

        let destination = f.destinations.find(&f.approved.id.to_string()).await.unwrap().unwrap();
        assert_eq!(destination.view_count, 2);
    }

    #[tokio::test]
    async fn test_views_of_unapproved_destinations_are_not_counted() {
        let f = setup().await;

        let counted = f
            .service
            .record_view(&f.pending.slug, Some(&f.admin), &Viewer::User(f.admin.id))
            .await
            .unwrap();
        assert!(!counted);
    }

    #[tokio::test]
    async fn test_deleting_user_discounts_their_likes_and_comments() {
        let f = setup().await;
        f.service.toggle_like(&f.tourist, "kuta").await.unwrap();
        f.service.toggle_like(&f.other, "kuta").await.unwrap();
        f.service.add_comment(&f.tourist, "kuta", "first").await.unwrap();
        f.service.add_comment(&f.tourist, "kuta", "second").await.unwrap();
        f.service.add_comment(&f.other, "kuta", "third").await.unwrap();

        f.users.delete(f.tourist.id).await.unwrap();

        let destination = f.destinations.find("kuta").await.unwrap().unwrap();
        assert_eq!(destination.like_count, 1);
        assert_eq!(destination.comment_count, 1);
        let listed = f.service.list_comments("kuta", None, &ListParams::default()).await.unwrap();
        assert_eq!(listed.total, 1);
        assert!(f.service.like_status(&f.other, "kuta").await.unwrap().liked);
    }
}
