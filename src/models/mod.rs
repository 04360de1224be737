//! Data models
//!
//! Database entities of the marketplace plus the small value types shared
//! between repositories, services and the API layer.

mod assignment;
mod category;
mod destination;
mod engagement;
mod form_field;
mod landing;
mod pagination;
mod session;
mod stats;
mod user;

pub use assignment::{AssignmentEntry, ProviderCategory, ServiceProviderCategory};
pub use category::{Category, CategoryWithSubcategories, Subcategory};
pub use destination::{
    Destination, DestinationDetail, DestinationFilter, DestinationSort, DestinationStatus,
};
pub use engagement::{fingerprint, Comment, CommentWithAuthor, LikeStatus, Viewer};
pub use form_field::{FieldOptions, FieldType, FieldWidth, FormField};
pub use landing::{ExperienceActivity, ExperienceCard, HeroCard, LandingPageConfig, DEFAULT_HERO_TITLE};
pub use pagination::{ListParams, PagedResult};
pub use session::Session;
pub use stats::{MarketplaceStats, RoleCounts, StatusCounts, TopDestination};
pub use user::{ProviderContact, User, UserRole, UserStatus};
