//! Landing page repository
//!
//! The page is one configuration row (id = 1) plus three collections that
//! are replaced wholesale on every save.

use crate::db::pool::Backend;
use crate::db::DynDatabasePool;
use crate::models::{ExperienceActivity, ExperienceCard, HeroCard, LandingPageConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const CONFIG_ID: i64 = 1;

#[async_trait]
pub trait LandingRepository: Send + Sync {
    /// Saved configuration, `None` before the first save
    async fn get(&self) -> Result<Option<LandingPageConfig>>;

    /// Overwrite the configuration and all three collections atomically
    async fn replace(&self, config: &LandingPageConfig, updated_by: i64) -> Result<LandingPageConfig>;
}

pub struct SqlxLandingRepository {
    pool: DynDatabasePool,
}

impl SqlxLandingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LandingRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_CONFIG: &str = r#"
    SELECT hero_title, hero_subtitle, hero_image, experience_title, experience_subtitle,
           updated_by, updated_at
    FROM landing_page_config WHERE id = ?
"#;
const SELECT_HERO_CARDS: &str =
    "SELECT id, title, subtitle, image, link, sort_order FROM hero_cards ORDER BY sort_order ASC, id ASC";
const SELECT_ACTIVITIES: &str =
    "SELECT id, title, description, icon, sort_order FROM experience_activities ORDER BY sort_order ASC, id ASC";
const SELECT_EXPERIENCE_CARDS: &str = "SELECT id, title, description, image, destination_id, sort_order \
     FROM experience_cards ORDER BY sort_order ASC, id ASC";

const INSERT_CONFIG: &str = r#"
    INSERT INTO landing_page_config (id, hero_title, hero_subtitle, hero_image, experience_title,
                                     experience_subtitle, updated_by, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;
const INSERT_HERO_CARD: &str =
    "INSERT INTO hero_cards (title, subtitle, image, link, sort_order) VALUES (?, ?, ?, ?, ?)";
const INSERT_ACTIVITY: &str =
    "INSERT INTO experience_activities (title, description, icon, sort_order) VALUES (?, ?, ?, ?)";
const INSERT_EXPERIENCE_CARD: &str = "INSERT INTO experience_cards (title, description, image, destination_id, sort_order) \
     VALUES (?, ?, ?, ?, ?)";

const CLEAR_STATEMENTS: [&str; 4] = [
    "DELETE FROM landing_page_config WHERE id = ?",
    "DELETE FROM hero_cards",
    "DELETE FROM experience_activities",
    "DELETE FROM experience_cards",
];

#[async_trait]
impl LandingRepository for SqlxLandingRepository {
    async fn get(&self) -> Result<Option<LandingPageConfig>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let Some(row) = sqlx::query(SELECT_CONFIG)
                    .bind(CONFIG_ID)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get landing page")?
                else {
                    return Ok(None);
                };
                let hero_cards = sqlx::query(SELECT_HERO_CARDS)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get hero cards")?
                    .iter()
                    .map(|r| HeroCard {
                        id: r.get("id"),
                        title: r.get("title"),
                        subtitle: r.get("subtitle"),
                        image: r.get("image"),
                        link: r.get("link"),
                        sort_order: r.get("sort_order"),
                    })
                    .collect();
                let experience_activities = sqlx::query(SELECT_ACTIVITIES)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get experience activities")?
                    .iter()
                    .map(|r| ExperienceActivity {
                        id: r.get("id"),
                        title: r.get("title"),
                        description: r.get("description"),
                        icon: r.get("icon"),
                        sort_order: r.get("sort_order"),
                    })
                    .collect();
                let experience_cards = sqlx::query(SELECT_EXPERIENCE_CARDS)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get experience cards")?
                    .iter()
                    .map(|r| ExperienceCard {
                        id: r.get("id"),
                        title: r.get("title"),
                        description: r.get("description"),
                        image: r.get("image"),
                        destination_id: r.get("destination_id"),
                        sort_order: r.get("sort_order"),
                    })
                    .collect();

                Ok(Some(LandingPageConfig {
                    hero_title: row.get("hero_title"),
                    hero_subtitle: row.get("hero_subtitle"),
                    hero_image: row.get("hero_image"),
                    experience_title: row.get("experience_title"),
                    experience_subtitle: row.get("experience_subtitle"),
                    updated_by: row.get("updated_by"),
                    updated_at: Some(row.get("updated_at")),
                    hero_cards,
                    experience_activities,
                    experience_cards,
                }))
            }
            Backend::Mysql(pool) => {
                let Some(row) = sqlx::query(SELECT_CONFIG)
                    .bind(CONFIG_ID)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get landing page")?
                else {
                    return Ok(None);
                };
                let hero_cards = sqlx::query(SELECT_HERO_CARDS)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get hero cards")?
                    .iter()
                    .map(|r| HeroCard {
                        id: r.get("id"),
                        title: r.get("title"),
                        subtitle: r.get("subtitle"),
                        image: r.get("image"),
                        link: r.get("link"),
                        sort_order: r.get("sort_order"),
                    })
                    .collect();
                let experience_activities = sqlx::query(SELECT_ACTIVITIES)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get experience activities")?
                    .iter()
                    .map(|r| ExperienceActivity {
                        id: r.get("id"),
                        title: r.get("title"),
                        description: r.get("description"),
                        icon: r.get("icon"),
                        sort_order: r.get("sort_order"),
                    })
                    .collect();
                let experience_cards = sqlx::query(SELECT_EXPERIENCE_CARDS)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get experience cards")?
                    .iter()
                    .map(|r| ExperienceCard {
                        id: r.get("id"),
                        title: r.get("title"),
                        description: r.get("description"),
                        image: r.get("image"),
                        destination_id: r.get("destination_id"),
                        sort_order: r.get("sort_order"),
                    })
                    .collect();

                Ok(Some(LandingPageConfig {
                    hero_title: row.get("hero_title"),
                    hero_subtitle: row.get("hero_subtitle"),
                    hero_image: row.get("hero_image"),
                    experience_title: row.get("experience_title"),
                    experience_subtitle: row.get("experience_subtitle"),
                    updated_by: row.get("updated_by"),
                    updated_at: Some(row.get("updated_at")),
                    hero_cards,
                    experience_activities,
                    experience_cards,
                }))
            }
        }
    }

    async fn replace(&self, config: &LandingPageConfig, updated_by: i64) -> Result<LandingPageConfig> {
        let now = Utc::now();
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for (i, sql) in CLEAR_STATEMENTS.iter().enumerate() {
                    let query = sqlx::query(sql);
                    let query = if i == 0 { query.bind(CONFIG_ID) } else { query };
                    query.execute(&mut *tx).await.context("Failed to clear landing page")?;
                }
                sqlx::query(INSERT_CONFIG)
                    .bind(CONFIG_ID)
                    .bind(&config.hero_title)
                    .bind(&config.hero_subtitle)
                    .bind(&config.hero_image)
                    .bind(&config.experience_title)
                    .bind(&config.experience_subtitle)
                    .bind(updated_by)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to save landing page")?;
                for card in &config.hero_cards {
                    sqlx::query(INSERT_HERO_CARD)
                        .bind(&card.title)
                        .bind(&card.subtitle)
                        .bind(&card.image)
                        .bind(&card.link)
                        .bind(card.sort_order)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to save hero card")?;
                }
                for activity in &config.experience_activities {
                    sqlx::query(INSERT_ACTIVITY)
                        .bind(&activity.title)
                        .bind(&activity.description)
                        .bind(&activity.icon)
                        .bind(activity.sort_order)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to save experience activity")?;
                }
                for card in &config.experience_cards {
                    sqlx::query(INSERT_EXPERIENCE_CARD)
                        .bind(&card.title)
                        .bind(&card.description)
                        .bind(&card.image)
                        .bind(card.destination_id)
                        .bind(card.sort_order)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to save experience card")?;
                }
                tx.commit().await.context("Failed to commit landing page")?;
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for (i, sql) in CLEAR_STATEMENTS.iter().enumerate() {
                    let query = sqlx::query(sql);
                    let query = if i == 0 { query.bind(CONFIG_ID) } else { query };
                    query.execute(&mut *tx).await.context("Failed to clear landing page")?;
                }
                sqlx::query(INSERT_CONFIG)
                    .bind(CONFIG_ID)
                    .bind(&config.hero_title)
                    .bind(&config.hero_subtitle)
                    .bind(&config.hero_image)
                    .bind(&config.experience_title)
                    .bind(&config.experience_subtitle)
                    .bind(updated_by)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to save landing page")?;
                for card in &config.hero_cards {
                    sqlx::query(INSERT_HERO_CARD)
                        .bind(&card.title)
                        .bind(&card.subtitle)
                        .bind(&card.image)
                        .bind(&card.link)
                        .bind(card.sort_order)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to save hero card")?;
                }
                for activity in &config.experience_activities {
                    sqlx::query(INSERT_ACTIVITY)
                        .bind(&activity.title)
                        .bind(&activity.description)
                        .bind(&activity.icon)
                        .bind(activity.sort_order)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to save experience activity")?;
                }
                for card in &config.experience_cards {
                    sqlx::query(INSERT_EXPERIENCE_CARD)
                        .bind(&card.title)
                        .bind(&card.description)
                        .bind(&card.image)
                        .bind(card.destination_id)
                        .bind(card.sort_order)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to save experience card")?;
                }
                tx.commit().await.context("Failed to commit landing page")?;
            }
        }

        self.get()
            .await?
            .ok_or_else(|| anyhow::anyhow!("Landing page not found after save"))
    }
}
