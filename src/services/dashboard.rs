//! Admin dashboard

use crate::db::repositories::StatsRepository;
use crate::models::MarketplaceStats;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum DashboardServiceError {
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Dashboard payload
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub stats: MarketplaceStats,
    /// Destinations waiting for moderation
    pub pending_review: i64,
    pub generated_at: DateTime<Utc>,
}

pub struct DashboardService {
    stats_repo: Arc<dyn StatsRepository>,
}

impl DashboardService {
    pub fn new(stats_repo: Arc<dyn StatsRepository>) -> Self {
        Self { stats_repo }
    }

    pub async fn dashboard(&self) -> Result<Dashboard, DashboardServiceError> {
        let stats = self
            .stats_repo
            .marketplace_stats()
            .await
            .context("Failed to collect marketplace statistics")?;

        Ok(Dashboard {
            pending_review: stats.destinations.pending,
            stats,
            generated_at: Utc::now(),
        })
    }
}
