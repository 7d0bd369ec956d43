//! Property (listing) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;
use crate::access::{Document, Value};

/// A real-estate listing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Property {
    pub id: i64,
    pub title: String,
    /// URL-friendly identifier (unique)
    pub slug: String,
    pub description: String,
    /// Asking price in whole currency units
    pub price: i64,
    pub address: String,
    pub city: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    /// Floor area in square metres
    pub area: f64,
    pub property_type_id: Option<i64>,
    /// Listing agent
    pub owner_id: Option<i64>,
    /// Moderation status
    #[sqlx(try_from = "String")]
    pub status: PropertyStatus,
    /// Unpublished working copy
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Property {
    /// Visible to the public (approved and not a draft)
    pub fn is_listed(&self) -> bool {
        self.status == PropertyStatus::Approved && !self.is_draft
    }
}

impl Document for Property {
    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.into(),
            "slug" => self.slug.as_str().into(),
            "owner_id" => self.owner_id.into(),
            "status" => self.status.to_string().into(),
            "is_draft" => self.is_draft.into(),
            _ => Value::Null,
        }
    }
}

/// Moderation status of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyStatus::Pending => write!(f, "pending"),
            PropertyStatus::Approved => write!(f, "approved"),
            PropertyStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for PropertyStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PropertyStatus::Pending),
            "approved" => Ok(PropertyStatus::Approved),
            "rejected" => Ok(PropertyStatus::Rejected),
            _ => Err(ParseEnumError::new("property status", s)),
        }
    }
}

impl TryFrom<String> for PropertyStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Input for creating a listing
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePropertyInput {
    pub title: String,
    /// Generated from the title when omitted
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub bedrooms: i32,
    #[serde(default)]
    pub bathrooms: i32,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub property_type_id: Option<i64>,
    /// Only honoured for admins
    #[serde(default)]
    pub status: Option<PropertyStatus>,
    #[serde(default)]
    pub is_draft: bool,
}

/// Input for updating a listing; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePropertyInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area: Option<f64>,
    pub property_type_id: Option<i64>,
    /// Only honoured for admins
    pub status: Option<PropertyStatus>,
    pub is_draft: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("Approved".parse::<PropertyStatus>().unwrap(), PropertyStatus::Approved);
        assert!("sold".parse::<PropertyStatus>().is_err());
        assert_eq!(PropertyStatus::default(), PropertyStatus::Pending);
    }
}
