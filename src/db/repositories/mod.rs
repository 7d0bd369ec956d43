//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod content;
pub mod media;
pub mod property;
pub mod property_type;
pub mod query;
pub mod session;
pub mod user;
pub mod verification;

pub use content::{ContentRepository, SqlxContentRepository};
pub use media::{MediaRepository, SqlxMediaRepository};
pub use property::{PropertyRepository, SqlxPropertyRepository};
pub use property_type::{PropertyTypeRepository, SqlxPropertyTypeRepository};
pub use query::SITEMAP_LIMIT;
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use verification::{SqlxVerificationRepository, VerificationRepository};
