//! Service provider assignment service
//!
//! Admins grant providers the categories (or single subcategories) they may
//! publish destinations under. A grant without a subcategory covers the whole
//! category.

use crate::db::repositories::{
    AssignmentRepository, CategoryRepository, SubcategoryRepository, UserRepository,
};
use crate::models::{AssignmentEntry, ProviderCategory, ServiceProviderCategory};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AssignmentServiceError {
    #[error("User not found")]
    UserNotFound,

    /// Target user is not a service provider
    #[error("User {0} is not a service provider")]
    NotProvider(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct AssignmentService {
    repo: Arc<dyn AssignmentRepository>,
    user_repo: Arc<dyn UserRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    subcategory_repo: Arc<dyn SubcategoryRepository>,
}

impl AssignmentService {
    pub fn new(
        repo: Arc<dyn AssignmentRepository>,
        user_repo: Arc<dyn UserRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        subcategory_repo: Arc<dyn SubcategoryRepository>,
    ) -> Self {
        Self {
            repo,
            user_repo,
            category_repo,
            subcategory_repo,
        }
    }

    /// Replace a provider's assignments.
    ///
    /// Entries are validated first, duplicates collapsed, then the whole set
    /// is swapped in one transaction.
    pub async fn set_assignments(
        &self,
        provider_id: i64,
        entries: Vec<AssignmentEntry>,
    ) -> Result<Vec<ServiceProviderCategory>, AssignmentServiceError> {
        let user = self
            .user_repo
            .get_by_id(provider_id)
            .await
            .context("Failed to get user")?
            .ok_or(AssignmentServiceError::UserNotFound)?;
        if !user.is_service_provider() {
            return Err(AssignmentServiceError::NotProvider(user.username));
        }

        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(entries.len());
        for entry in entries {
            if seen.insert(entry) {
                unique.push(entry);
            }
        }

        for entry in &unique {
            self.validate_entry(entry).await?;
        }

        let assignments = self
            .repo
            .replace(provider_id, &unique)
            .await
            .context("Failed to replace assignments")?;

        tracing::info!(
            "Assignments updated for provider {}: {} entr{}",
            user.username,
            assignments.len(),
            if assignments.len() == 1 { "y" } else { "ies" }
        );
        Ok(assignments)
    }

    pub async fn list_assignments(
        &self,
        provider_id: i64,
    ) -> Result<Vec<ServiceProviderCategory>, AssignmentServiceError> {
        self.repo
            .list_by_user(provider_id)
            .await
            .context("Failed to list assignments")
            .map_err(Into::into)
    }

    /// Whether the provider may publish under the category (and subcategory).
    ///
    /// Without a subcategory, any assignment in the category suffices.
    pub async fn can_submit(
        &self,
        provider_id: i64,
        category_id: i64,
        subcategory_id: Option<i64>,
    ) -> Result<bool, AssignmentServiceError> {
        self.repo
            .has_assignment(provider_id, category_id, subcategory_id)
            .await
            .context("Failed to check assignment")
            .map_err(Into::into)
    }

    /// Categories a provider may publish under, with the reachable subcategories
    pub async fn provider_categories(
        &self,
        provider_id: i64,
    ) -> Result<Vec<ProviderCategory>, AssignmentServiceError> {
        let assignments = self.list_assignments(provider_id).await?;
        let categories = self.category_repo.list().await.context("Failed to list categories")?;

        let mut result = Vec::new();
        for category in categories {
            let granted: Vec<&ServiceProviderCategory> = assignments
                .iter()
                .filter(|a| a.category_id == category.id)
                .collect();
            if granted.is_empty() {
                continue;
            }

            let whole_category = granted.iter().any(|a| a.subcategory_id.is_none());
            let subcategories = self
                .subcategory_repo
                .list_by_category(category.id)
                .await
                .context("Failed to list subcategories")?
                .into_iter()
                .filter(|sub| whole_category || granted.iter().any(|a| a.subcategory_id == Some(sub.id)))
                .collect();

            result.push(ProviderCategory {
                category,
                whole_category,
                subcategories,
            });
        }

        Ok(result)
    }

    async fn validate_entry(&self, entry: &AssignmentEntry) -> Result<(), AssignmentServiceError> {
        if self
            .category_repo
            .get_by_id(entry.category_id)
            .await
            .context("Failed to get category")?
            .is_none()
        {
            return Err(AssignmentServiceError::CategoryNotFound(entry.category_id));
        }

        if let Some(subcategory_id) = entry.subcategory_id {
            let subcategory = self
                .subcategory_repo
                .get_by_id(subcategory_id)
                .await
                .context("Failed to get subcategory")?;
            match subcategory {
                Some(sub) if sub.belongs_to(entry.category_id) => {}
                Some(_) => {
                    return Err(AssignmentServiceError::ValidationError(format!(
                        "Subcategory {} does not belong to category {}",
                        subcategory_id, entry.category_id
                    )))
                }
                None => {
                    return Err(AssignmentServiceError::ValidationError(format!(
                        "Subcategory {} not found",
                        subcategory_id
                    )))
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxAssignmentRepository, SqlxCategoryRepository, SqlxSubcategoryRepository,
        SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, Subcategory, User, UserRole};

    struct Fixture {
        service: AssignmentService,
        provider: User,
        tourist: User,
        beach: Category,
        mountain: Category,
        surf: Subcategory,
        hiking: Subcategory,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let subcategories = SqlxSubcategoryRepository::boxed(pool.clone());

        let provider = users
            .create(&User::new("guide".into(), "g@x.io".into(), "h".into(), UserRole::ServiceProvider))
            .await
            .unwrap();
        let tourist = users
            .create(&User::new("tourist".into(), "t@x.io".into(), "h".into(), UserRole::User))
            .await
            .unwrap();
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
        subcategories
            .create(&Subcategory::new(beach.id, "diving".into(), "Diving".into(), None, 1))
            .await
            .unwrap();
        let hiking = subcategories
            .create(&Subcategory::new(mountain.id, "hiking".into(), "Hiking".into(), None, 0))
            .await
            .unwrap();

        let service = AssignmentService::new(
            SqlxAssignmentRepository::boxed(pool.clone()),
            users,
            categories,
            subcategories,
        );

        Fixture {
            service,
            provider,
            tourist,
            beach,
            mountain,
            surf,
            hiking,
        }
    }

    #[tokio::test]
    async fn test_set_assignments_collapses_duplicates() {
        let f = setup().await;

        let assignments = f
            .service
            .set_assignments(
                f.provider.id,
                vec![
                    AssignmentEntry::whole_category(f.beach.id),
                    AssignmentEntry::whole_category(f.beach.id),
                    AssignmentEntry::new(f.mountain.id, Some(f.hiking.id)),
                ],
            )
            .await
            .unwrap();

        assert_eq!(assignments.len(), 2);
    }

    #[tokio::test]
    async fn test_set_assignments_replaces_previous_set() {
        let f = setup().await;
        f.service
            .set_assignments(f.provider.id, vec![AssignmentEntry::whole_category(f.beach.id)])
            .await
            .unwrap();

        f.service
            .set_assignments(f.provider.id, vec![AssignmentEntry::whole_category(f.mountain.id)])
            .await
            .unwrap();

        let current = f.service.list_assignments(f.provider.id).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].category_id, f.mountain.id);
    }

    #[tokio::test]
    async fn test_set_assignments_requires_provider_role() {
        let f = setup().await;

        let result = f
            .service
            .set_assignments(f.tourist.id, vec![AssignmentEntry::whole_category(f.beach.id)])
            .await;
        assert!(matches!(result, Err(AssignmentServiceError::NotProvider(_))));

        let result = f.service.set_assignments(999, vec![]).await;
        assert!(matches!(result, Err(AssignmentServiceError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_set_assignments_rejects_foreign_subcategory() {
        let f = setup().await;

        let result = f
            .service
            .set_assignments(f.provider.id, vec![AssignmentEntry::new(f.beach.id, Some(f.hiking.id))])
            .await;
        assert!(matches!(result, Err(AssignmentServiceError::ValidationError(_))));

        let result = f
            .service
            .set_assignments(f.provider.id, vec![AssignmentEntry::whole_category(777)])
            .await;
        assert!(matches!(result, Err(AssignmentServiceError::CategoryNotFound(777))));
    }

    #[tokio::test]
    async fn test_can_submit() {
        let f = setup().await;
        f.service
            .set_assignments(
                f.provider.id,
                vec![
                    AssignmentEntry::whole_category(f.beach.id),
                    AssignmentEntry::new(f.mountain.id, Some(f.hiking.id)),
                ],
            )
            .await
            .unwrap();

        // Whole category grants every subcategory
        assert!(f.service.can_submit(f.provider.id, f.beach.id, Some(f.surf.id)).await.unwrap());
        assert!(f.service.can_submit(f.provider.id, f.beach.id, None).await.unwrap());
        // Exact pair, or no subcategory at all
        assert!(f.service.can_submit(f.provider.id, f.mountain.id, Some(f.hiking.id)).await.unwrap());
        assert!(f.service.can_submit(f.provider.id, f.mountain.id, None).await.unwrap());
        assert!(!f.service.can_submit(f.tourist.id, f.beach.id, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_provider_categories() {
        let f = setup().await;
        f.service
            .set_assignments(
                f.provider.id,
                vec![
                    AssignmentEntry::whole_category(f.beach.id),
                    AssignmentEntry::new(f.mountain.id, Some(f.hiking.id)),
                ],
            )
            .await
            .unwrap();

        let categories = f.service.provider_categories(f.provider.id).await.unwrap();

        assert_eq!(categories.len(), 2);
        assert!(categories[0].whole_category);
        assert_eq!(categories[0].subcategories.len(), 2);
        assert!(!categories[1].whole_category);
        assert_eq!(categories[1].subcategories.len(), 1);
        assert_eq!(categories[1].subcategories[0].id, f.hiking.id);
    }
}
