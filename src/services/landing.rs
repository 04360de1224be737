//! Landing page service
//!
//! Serves the public home page configuration, falling back to defaults
//! before an admin has saved one, and replaces it atomically on update.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{DestinationRepository, LandingRepository};
use crate::models::{ExperienceActivity, ExperienceCard, HeroCard, LandingPageConfig, User};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Cache key of the landing configuration; dropped whenever a referenced destination may have changed
pub const CACHE_KEY_LANDING: &str = "landing:config";
const LANDING_CACHE_TTL_SECS: u64 = 600;

/// Upper bound for each of the three collections
pub const MAX_COLLECTION_ITEMS: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum LandingServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Full replacement of the landing page
#[derive(Debug, Clone, Deserialize)]
pub struct LandingInput {
    pub hero_title: String,
    #[serde(default)]
    pub hero_subtitle: Option<String>,
    #[serde(default)]
    pub hero_image: Option<String>,
    #[serde(default)]
    pub experience_title: Option<String>,
    #[serde(default)]
    pub experience_subtitle: Option<String>,
    #[serde(default)]
    pub hero_cards: Vec<HeroCard>,
    #[serde(default)]
    pub experience_activities: Vec<ExperienceActivity>,
    #[serde(default)]
    pub experience_cards: Vec<ExperienceCard>,
}

impl LandingInput {
    pub fn new(hero_title: impl Into<String>) -> Self {
        Self {
            hero_title: hero_title.into(),
            hero_subtitle: None,
            hero_image: None,
            experience_title: None,
            experience_subtitle: None,
            hero_cards: Vec::new(),
            experience_activities: Vec::new(),
            experience_cards: Vec::new(),
        }
    }

    fn into_config(self) -> LandingPageConfig {
        LandingPageConfig {
            hero_title: self.hero_title.trim().to_string(),
            hero_subtitle: non_empty(self.hero_subtitle),
            hero_image: non_empty(self.hero_image),
            experience_title: non_empty(self.experience_title),
            experience_subtitle: non_empty(self.experience_subtitle),
            updated_by: None,
            updated_at: None,
            hero_cards: self.hero_cards,
            experience_activities: self.experience_activities,
            experience_cards: self.experience_cards,
        }
    }
}

fn validate_config(config: &LandingPageConfig) -> Result<(), String> {
    if config.hero_title.is_empty() {
        return Err("Hero title cannot be empty".to_string());
    }

    let collections = [
        ("hero cards", config.hero_cards.len()),
        ("experience activities", config.experience_activities.len()),
        ("experience cards", config.experience_cards.len()),
    ];
    for (name, len) in collections {
        if len > MAX_COLLECTION_ITEMS {
            return Err(format!("At most {} {} are allowed", MAX_COLLECTION_ITEMS, name));
        }
    }

    let titles = config
        .hero_cards
        .iter()
        .map(|c| c.title.as_str())
        .chain(config.experience_activities.iter().map(|a| a.title.as_str()))
        .chain(config.experience_cards.iter().map(|c| c.title.as_str()));
    for title in titles {
        if title.trim().is_empty() {
            return Err("Every card and activity needs a title".to_string());
        }
    }

    Ok(())
}

pub struct LandingService {
    repo: Arc<dyn LandingRepository>,
    destination_repo: Arc<dyn DestinationRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl LandingService {
    pub fn new(
        repo: Arc<dyn LandingRepository>,
        destination_repo: Arc<dyn DestinationRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self::with_cache_ttl(
            repo,
            destination_repo,
            cache,
            Duration::from_secs(LANDING_CACHE_TTL_SECS),
        )
    }

    /// Create a landing service with custom cache TTL
    pub fn with_cache_ttl(
        repo: Arc<dyn LandingRepository>,
        destination_repo: Arc<dyn DestinationRepository>,
        cache: Arc<Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            destination_repo,
            cache,
            cache_ttl,
        }
    }

    /// The saved configuration, or the default page
    pub async fn get(&self) -> Result<LandingPageConfig, LandingServiceError> {
        if let Some(config) = self
            .cache
            .get::<LandingPageConfig>(CACHE_KEY_LANDING)
            .await
            .ok()
            .flatten()
        {
            return Ok(config);
        }

        let config = self
            .repo
            .get()
            .await
            .context("Failed to load landing page")?
            .unwrap_or_default();

        let _ = self.cache.set(CACHE_KEY_LANDING, &config, self.cache_ttl).await;

        Ok(config)
    }

    /// Replace the configuration and its three collections
    pub async fn update(&self, admin: &User, input: LandingInput) -> Result<LandingPageConfig, LandingServiceError> {
        let mut config = input.into_config();
        validate_config(&config).map_err(LandingServiceError::ValidationError)?;

        for card in &config.experience_cards {
            if let Some(destination_id) = card.destination_id {
                if self
                    .destination_repo
                    .get_by_id(destination_id)
                    .await
                    .context("Failed to get destination")?
                    .is_none()
                {
                    return Err(LandingServiceError::ValidationError(format!(
                        "Experience card '{}' references missing destination {}",
                        card.title, destination_id
                    )));
                }
            }
        }

        config.normalize_order();
        let saved = self
            .repo
            .replace(&config, admin.id)
            .await
            .context("Failed to save landing page")?;

        let _ = self.cache.delete(CACHE_KEY_LANDING).await;

        tracing::info!("Landing page updated by {}", admin.username);
        Ok(saved)
    }

    /// Drop the cached configuration so the next read reloads it
    pub async fn invalidate(&self) {
        let _ = self.cache.delete(CACHE_KEY_LANDING).await;
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
