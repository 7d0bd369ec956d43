//! Services layer - Business logic
//!
//! Services apply the access predicates, validate input and coordinate the
//! repositories with the sitemap cache.

pub mod content;
pub mod error;
pub mod media;
pub mod password;
pub mod property;
pub mod property_type;
pub mod seed;
pub mod sitemap;
pub mod slug;
pub mod user;
pub mod verification;

pub use content::ContentService;
pub use error::ContentError;
pub use media::{MediaService, UploadedFile};
pub use password::{hash_password, verify_password};
pub use property::PropertyService;
pub use property_type::PropertyTypeService;
pub use seed::{seed_property_types, SeedReport};
pub use sitemap::{SitemapEntry, SitemapSection, SitemapService};
pub use slug::generate_slug;
pub use user::{LoginInput, RegisterInput, UpdateUserInput, UserService, UserServiceError};
pub use verification::VerificationService;
