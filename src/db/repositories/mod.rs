//! Database repositories
//!
//! One trait per entity plus its SQLx implementation. Services hold the
//! trait objects so tests can swap implementations.

pub mod assignment;
pub mod category;
pub mod destination;
pub mod engagement;
pub mod form_field;
pub mod landing;
pub mod session;
pub mod stats;
pub mod subcategory;
pub mod user;

pub use assignment::{AssignmentRepository, SqlxAssignmentRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use destination::{DestinationRepository, SqlxDestinationRepository};
pub use engagement::{EngagementRepository, SqlxEngagementRepository};
pub use form_field::{FormFieldRepository, SqlxFormFieldRepository};
pub use landing::{LandingRepository, SqlxLandingRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use stats::{SqlxStatsRepository, StatsRepository};
pub use subcategory::{SqlxSubcategoryRepository, SubcategoryRepository};
pub use user::{SqlxUserRepository, UserRepository};
