//! Data models
//!
//! This module contains the data structures used throughout Listora:
//! - Collection documents (User, Media, Property, PropertyType, content entries,
//!   VerificationRequest)
//! - Sessions
//! - Pagination helpers shared by every list endpoint

mod content;
mod media;
mod pagination;
mod property;
mod property_type;
mod session;
mod sitemap;
mod user;
mod verification;

pub use content::{ContentEntry, ContentKind, CreateContentInput, UpdateContentInput};
pub use media::{Media, NewMedia, UpdateMediaInput};
pub use pagination::{ListParams, PagedResult};
pub use property::{CreatePropertyInput, Property, PropertyStatus, UpdatePropertyInput};
pub use property_type::{CreatePropertyTypeInput, PropertyType, UpdatePropertyTypeInput};
pub use session::Session;
pub use sitemap::SitemapRecord;
pub use user::{User, UserRole};
pub use verification::{
    CreateVerificationInput, UpdateVerificationInput, VerificationRequest, VerificationStatus,
};

/// Error returned when a stored enum value cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
