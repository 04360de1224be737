//! Dashboard statistics queries

use crate::db::pool::Backend;
use crate::db::DynDatabasePool;
use crate::models::{MarketplaceStats, RoleCounts, StatusCounts, TopDestination};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

/// Number of destinations in the "most viewed" list
pub const TOP_DESTINATIONS_LIMIT: i64 = 5;

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn marketplace_stats(&self) -> Result<MarketplaceStats>;
}

pub struct SqlxStatsRepository {
    pool: DynDatabasePool,
}

impl SqlxStatsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn StatsRepository> {
        Arc::new(Self::new(pool))
    }
}

const USERS_BY_ROLE: &str = "SELECT role AS label, COUNT(*) AS count FROM users GROUP BY role";
const DESTINATIONS_BY_STATUS: &str = "SELECT status AS label, COUNT(*) AS count FROM destinations GROUP BY status";
const TOTALS: [(&str, &str); 5] = [
    ("categories", "SELECT COUNT(*) AS count FROM categories"),
    ("subcategories", "SELECT COUNT(*) AS count FROM subcategories"),
    ("comments", "SELECT COUNT(*) AS count FROM comments"),
    ("likes", "SELECT COUNT(*) AS count FROM likes"),
    ("views", "SELECT COUNT(*) AS count FROM destination_views"),
];
const TOP_DESTINATIONS: &str = r#"
    SELECT id, slug, title, view_count, like_count, comment_count
    FROM destinations
    WHERE status = 'approved'
    ORDER BY view_count DESC, like_count DESC, id ASC
    LIMIT ?
"#;

fn role_counts(groups: &HashMap<String, i64>) -> RoleCounts {
    RoleCounts {
        admin: groups.get("admin").copied().unwrap_or(0),
        service_provider: groups.get("service_provider").copied().unwrap_or(0),
        user: groups.get("user").copied().unwrap_or(0),
    }
}

fn status_counts(groups: &HashMap<String, i64>) -> StatusCounts {
    StatusCounts {
        pending: groups.get("pending").copied().unwrap_or(0),
        approved: groups.get("approved").copied().unwrap_or(0),
        rejected: groups.get("rejected").copied().unwrap_or(0),
    }
}

#[async_trait]
impl StatsRepository for SqlxStatsRepository {
    async fn marketplace_stats(&self) -> Result<MarketplaceStats> {
        let mut stats = MarketplaceStats::default();
        let mut totals = HashMap::new();

        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let roles: HashMap<String, i64> = sqlx::query(USERS_BY_ROLE)
                    .fetch_all(pool)
                    .await
                    .context("Failed to count users")?
                    .iter()
                    .map(|row| (row.get("label"), row.get("count")))
                    .collect();
                let statuses: HashMap<String, i64> = sqlx::query(DESTINATIONS_BY_STATUS)
                    .fetch_all(pool)
                    .await
                    .context("Failed to count destinations")?
                    .iter()
                    .map(|row| (row.get("label"), row.get("count")))
                    .collect();
                for (name, sql) in TOTALS {
                    let count: i64 = sqlx::query(sql)
                        .fetch_one(pool)
                        .await
                        .with_context(|| format!("Failed to count {}", name))?
                        .get("count");
                    totals.insert(name, count);
                }
                stats.top_destinations = sqlx::query(TOP_DESTINATIONS)
                    .bind(TOP_DESTINATIONS_LIMIT)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list top destinations")?
                    .iter()
                    .map(|row| TopDestination {
                        id: row.get("id"),
                        slug: row.get("slug"),
                        title: row.get("title"),
                        view_count: row.get("view_count"),
                        like_count: row.get("like_count"),
                        comment_count: row.get("comment_count"),
                    })
                    .collect();
                stats.users = role_counts(&roles);
                stats.destinations = status_counts(&statuses);
            }
            Backend::Mysql(pool) => {
                let roles: HashMap<String, i64> = sqlx::query(USERS_BY_ROLE)
                    .fetch_all(pool)
                    .await
                    .context("Failed to count users")?
                    .iter()
                    .map(|row| (row.get("label"), row.get("count")))
                    .collect();
                let statuses: HashMap<String, i64> = sqlx::query(DESTINATIONS_BY_STATUS)
                    .fetch_all(pool)
                    .await
                    .context("Failed to count destinations")?
                    .iter()
                    .map(|row| (row.get("label"), row.get("count")))
                    .collect();
                for (name, sql) in TOTALS {
                    let count: i64 = sqlx::query(sql)
                        .fetch_one(pool)
                        .await
                        .with_context(|| format!("Failed to count {}", name))?
                        .get("count");
                    totals.insert(name, count);
                }
                stats.top_destinations = sqlx::query(TOP_DESTINATIONS)
                    .bind(TOP_DESTINATIONS_LIMIT)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list top destinations")?
                    .iter()
                    .map(|row| TopDestination {
                        id: row.get("id"),
                        slug: row.get("slug"),
                        title: row.get("title"),
                        view_count: row.get("view_count"),
                        like_count: row.get("like_count"),
                        comment_count: row.get("comment_count"),
                    })
                    .collect();
                stats.users = role_counts(&roles);
                stats.destinations = status_counts(&statuses);
            }
        }

        let total = |name: &str| totals.get(name).copied().unwrap_or(0);
        stats.categories = total("categories");
        stats.subcategories = total("subcategories");
        stats.comments = total("comments");
        stats.likes = total("likes");
        stats.views = total("views");
        Ok(stats)
    }
}
