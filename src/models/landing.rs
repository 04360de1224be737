//! Landing page configuration
//!
//! A single configuration row plus three ordered collections that make up
//! the public home page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HERO_TITLE: &str = "Discover your next journey";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeroCard {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperienceActivity {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Icon name understood by the client
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperienceCard {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Destination the card links to
    #[serde(default)]
    pub destination_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LandingPageConfig {
    pub hero_title: String,
    pub hero_subtitle: Option<String>,
    pub hero_image: Option<String>,
    pub experience_title: Option<String>,
    pub experience_subtitle: Option<String>,
    pub updated_by: Option<i64>,
    /// `None` until an admin saves the page for the first time
    pub updated_at: Option<DateTime<Utc>>,
    pub hero_cards: Vec<HeroCard>,
    pub experience_activities: Vec<ExperienceActivity>,
    pub experience_cards: Vec<ExperienceCard>,
}

impl Default for LandingPageConfig {
    fn default() -> Self {
        Self {
            hero_title: DEFAULT_HERO_TITLE.to_string(),
            hero_subtitle: None,
            hero_image: None,
            experience_title: None,
            experience_subtitle: None,
            updated_by: None,
            updated_at: None,
            hero_cards: Vec::new(),
            experience_activities: Vec::new(),
            experience_cards: Vec::new(),
        }
    }
}

impl LandingPageConfig {
    /// Sort every collection by `sort_order`, then renumber 0..n
    pub fn normalize_order(&mut self) {
        self.hero_cards.sort_by_key(|c| c.sort_order);
        for (i, card) in self.hero_cards.iter_mut().enumerate() {
            card.sort_order = i as i32;
        }
        self.experience_activities.sort_by_key(|a| a.sort_order);
        for (i, activity) in self.experience_activities.iter_mut().enumerate() {
            activity.sort_order = i as i32;
        }
        self.experience_cards.sort_by_key(|c| c.sort_order);
        for (i, card) in self.experience_cards.iter_mut().enumerate() {
            card.sort_order = i as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LandingPageConfig::default();
        assert_eq!(config.hero_title, DEFAULT_HERO_TITLE);
        assert!(config.updated_at.is_none());
        assert!(config.hero_cards.is_empty());
    }

    #[test]
    fn test_normalize_order_is_stable() {
        let card = |title: &str, sort_order: i32| HeroCard {
            id: 0,
            title: title.to_string(),
            subtitle: None,
            image: None,
            link: None,
            sort_order,
        };
        let mut config = LandingPageConfig {
            hero_cards: vec![card("c", 9), card("a", 1), card("b", 1)],
            ..LandingPageConfig::default()
        };

        config.normalize_order();

        let titles: Vec<&str> = config.hero_cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        let orders: Vec<i32> = config.hero_cards.iter().map(|c| c.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }
}
