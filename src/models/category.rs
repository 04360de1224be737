//! Category and subcategory models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level grouping of destinations, e.g. "Beach" or "Mountain".
///
/// Every category owns its own dynamic form schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Display name (unique)
    pub name: String,
    pub description: Option<String>,
    /// Cover image URL
    pub image: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(slug: String, name: String, description: Option<String>, sort_order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug,
            name,
            description,
            image: None,
            sort_order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Second-level grouping; slug and name are unique within the parent category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subcategory {
    pub id: i64,
    pub category_id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subcategory {
    pub fn new(category_id: i64, slug: String, name: String, description: Option<String>, sort_order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            category_id,
            slug,
            name,
            description,
            sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this subcategory sits under the given category
    pub fn belongs_to(&self, category_id: i64) -> bool {
        self.category_id == category_id
    }
}

/// Category with its subcategories, as served by the public catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithSubcategories {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<Subcategory>,
}

impl CategoryWithSubcategories {
    /// Group a flat subcategory list under the given categories, keeping order
    pub fn group(categories: Vec<Category>, subcategories: Vec<Subcategory>) -> Vec<Self> {
        categories
            .into_iter()
            .map(|category| {
                let subcategories = subcategories
                    .iter()
                    .filter(|sub| sub.belongs_to(category.id))
                    .cloned()
                    .collect();
                Self {
                    category,
                    subcategories,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, slug: &str) -> Category {
        let mut category = Category::new(slug.to_string(), slug.to_uppercase(), None, 0);
        category.id = id;
        category
    }

    fn subcategory(id: i64, category_id: i64, slug: &str) -> Subcategory {
        let mut sub = Subcategory::new(category_id, slug.to_string(), slug.to_uppercase(), None, 0);
        sub.id = id;
        sub
    }

    #[test]
    fn test_subcategory_belongs_to() {
        let sub = subcategory(1, 10, "surf");
        assert!(sub.belongs_to(10));
        assert!(!sub.belongs_to(11));
    }

    #[test]
    fn test_group_keeps_category_order() {
        let grouped = CategoryWithSubcategories::group(
            vec![category(2, "mountain"), category(1, "beach")],
            vec![
                subcategory(1, 1, "surf"),
                subcategory(2, 2, "hiking"),
                subcategory(3, 1, "diving"),
            ],
        );

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].category.slug, "mountain");
        assert_eq!(grouped[0].subcategories.len(), 1);
        let beach_subs: Vec<&str> = grouped[1].subcategories.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(beach_subs, vec!["surf", "diving"]);
    }

    #[test]
    fn test_flattened_serialization() {
        let grouped = CategoryWithSubcategories {
            category: category(1, "beach"),
            subcategories: vec![],
        };
        let json = serde_json::to_value(&grouped).unwrap();
        assert_eq!(json["slug"], "beach");
        assert!(json["subcategories"].as_array().unwrap().is_empty());
    }
}
