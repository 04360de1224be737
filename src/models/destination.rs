//! Destination model
//!
//! A destination is a bookable listing submitted by a service provider (or
//! an admin). Its category-specific attributes live in `field_values`,
//! validated against the category's form fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::{Category, ProviderContact, Subcategory, User};

/// Moderation state of a destination.
///
/// ```text
/// pending  --approve--> approved
/// pending  --reject---> rejected
/// rejected --approve--> approved
/// approved --reject---> rejected
/// approved/rejected --provider edit--> pending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DestinationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl DestinationStatus {
    pub const ALL: [DestinationStatus; 3] = [
        DestinationStatus::Pending,
        DestinationStatus::Approved,
        DestinationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationStatus::Pending => "pending",
            DestinationStatus::Approved => "approved",
            DestinationStatus::Rejected => "rejected",
        }
    }

    pub fn can_approve(&self) -> bool {
        matches!(self, DestinationStatus::Pending | DestinationStatus::Rejected)
    }

    pub fn can_reject(&self) -> bool {
        matches!(self, DestinationStatus::Pending | DestinationStatus::Approved)
    }
}

impl fmt::Display for DestinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DestinationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DestinationStatus::Pending),
            "approved" => Ok(DestinationStatus::Approved),
            "rejected" => Ok(DestinationStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid destination status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Destination {
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    /// User who submitted the destination
    pub creator_id: i64,
    /// Admin who approved it
    pub approver_id: Option<i64>,
    pub status: DestinationStatus,
    pub price: f64,
    pub discount_price: Option<f64>,
    /// e.g. "per person", "per night"
    pub price_unit: Option<String>,
    pub location_name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub cover_image: Option<String>,
    /// Gallery image URLs
    pub images: Vec<String>,
    /// Values of the category's dynamic form fields
    pub field_values: Map<String, Value>,
    pub rejection_reason: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Destination {
    pub fn new(slug: String, title: String, description: String, category_id: i64, creator_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug,
            title,
            description,
            category_id,
            subcategory_id: None,
            creator_id,
            approver_id: None,
            status: DestinationStatus::Pending,
            price: 0.0,
            discount_price: None,
            price_unit: None,
            location_name: None,
            address: None,
            latitude: None,
            longitude: None,
            cover_image: None,
            images: Vec::new(),
            field_values: Map::new(),
            rejection_reason: None,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == DestinationStatus::Approved
    }

    /// Approved destinations are public; others only for their owner and admins.
    pub fn is_visible_to(&self, viewer: Option<&User>) -> bool {
        self.is_approved() || viewer.is_some_and(|user| user.can_manage(self.creator_id))
    }

    /// Price a customer actually pays
    pub fn effective_price(&self) -> f64 {
        self.discount_price.unwrap_or(self.price)
    }

    pub fn mark_approved(&mut self, approver_id: i64) {
        self.status = DestinationStatus::Approved;
        self.approver_id = Some(approver_id);
        self.approved_at = Some(Utc::now());
        self.rejection_reason = None;
    }

    pub fn mark_rejected(&mut self, reason: String) {
        self.status = DestinationStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.approver_id = None;
        self.approved_at = None;
    }

    /// Back to the moderation queue after a provider edit
    pub fn mark_pending(&mut self) {
        self.status = DestinationStatus::Pending;
        self.approver_id = None;
        self.approved_at = None;
        self.rejection_reason = None;
    }
}

/// Ordering of destination listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DestinationSort {
    #[default]
    Newest,
    /// Most viewed first
    Popular,
    PriceAsc,
    PriceDesc,
}

impl DestinationSort {
    /// ORDER BY clause, shared by both SQL dialects
    pub fn order_by(&self) -> &'static str {
        match self {
            DestinationSort::Newest => "created_at DESC, id DESC",
            DestinationSort::Popular => "view_count DESC, like_count DESC, id DESC",
            DestinationSort::PriceAsc => "COALESCE(discount_price, price) ASC, id ASC",
            DestinationSort::PriceDesc => "COALESCE(discount_price, price) DESC, id DESC",
        }
    }
}

impl FromStr for DestinationSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newest" => Ok(DestinationSort::Newest),
            "popular" => Ok(DestinationSort::Popular),
            "price_asc" => Ok(DestinationSort::PriceAsc),
            "price_desc" => Ok(DestinationSort::PriceDesc),
            _ => Err(anyhow::anyhow!("Invalid sort order: {}", s)),
        }
    }
}

/// Listing filter; unset members do not constrain the result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DestinationFilter {
    pub status: Option<DestinationStatus>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub creator_id: Option<i64>,
    /// Free text matched against title, description and location
    pub query: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: DestinationSort,
}

impl DestinationFilter {
    /// Public catalog: approved destinations only
    pub fn public() -> Self {
        Self {
            status: Some(DestinationStatus::Approved),
            ..Self::default()
        }
    }

    pub fn by_creator(creator_id: i64) -> Self {
        Self {
            creator_id: Some(creator_id),
            ..Self::default()
        }
    }
}

/// Destination page payload
#[derive(Debug, Clone, Serialize)]
pub struct DestinationDetail {
    #[serde(flatten)]
    pub destination: Destination,
    pub category: Category,
    pub subcategory: Option<Subcategory>,
    pub provider: Option<ProviderContact>,
}
