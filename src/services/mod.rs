//! Services layer - Business logic
//!
//! Services sit between the API handlers and the repositories. They:
//! - enforce marketplace rules (roles, assignments, moderation states)
//! - validate input, including dynamic category forms
//! - keep the cache in step with writes

pub mod assignment;
pub mod category;
pub mod dashboard;
pub mod destination;
pub mod engagement;
pub mod form;
pub mod landing;
pub mod password;
pub mod rate_limiter;
pub mod slug;
pub mod user;

pub use assignment::{AssignmentService, AssignmentServiceError};
pub use category::{CategoryService, CategoryServiceError, CreateCategoryInput, UpdateCategoryInput};
pub use dashboard::{Dashboard, DashboardService, DashboardServiceError};
pub use destination::{DestinationInput, DestinationService, DestinationServiceError};
pub use engagement::{EngagementService, EngagementServiceError};
pub use form::{
    layout, validate_values, CategoryForm, CreateFieldInput, FieldError, FormRow, FormService,
    FormServiceError, RowLayout, UpdateFieldInput,
};
pub use landing::{LandingInput, LandingService, LandingServiceError};
pub use password::{hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use slug::generate_slug;
pub use user::{
    AdminUpdateUserInput, CreateUserInput, LoginInput, ProfileInput, RegisterInput, UserService,
    UserServiceError,
};
