//! Service provider category assignments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Subcategory};

/// Grants a provider the right to publish under a category.
///
/// A missing `subcategory_id` grants the whole category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceProviderCategory {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Requested assignment, before it is stored
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AssignmentEntry {
    pub category_id: i64,
    #[serde(default)]
    pub subcategory_id: Option<i64>,
}

impl AssignmentEntry {
    pub fn new(category_id: i64, subcategory_id: Option<i64>) -> Self {
        Self {
            category_id,
            subcategory_id,
        }
    }

    pub fn whole_category(category_id: i64) -> Self {
        Self::new(category_id, None)
    }
}

impl From<&ServiceProviderCategory> for AssignmentEntry {
    fn from(assignment: &ServiceProviderCategory) -> Self {
        Self::new(assignment.category_id, assignment.subcategory_id)
    }
}

/// A category as seen by a provider: either all of it, or a subset of subcategories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCategory {
    #[serde(flatten)]
    pub category: Category,
    /// True when the whole category is granted
    pub whole_category: bool,
    /// Subcategories the provider may publish under
    pub subcategories: Vec<Subcategory>,
}
