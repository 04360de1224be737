//! Admin dashboard statistics

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleCounts {
    pub admin: i64,
    pub service_provider: i64,
    pub user: i64,
}

impl RoleCounts {
    pub fn total(&self) -> i64 {
        self.admin + self.service_provider + self.user
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.approved + self.rejected
    }
}

/// Most viewed approved destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopDestination {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
}

/// Marketplace totals read straight from the database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketplaceStats {
    pub users: RoleCounts,
    pub destinations: StatusCounts,
    pub categories: i64,
    pub subcategories: i64,
    pub comments: i64,
    pub likes: i64,
    pub views: i64,
    pub top_destinations: Vec<TopDestination>,
}
