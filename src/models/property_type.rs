//! Property type model (reference data)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of property, e.g. apartment or villa
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PropertyType {
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// URL-friendly identifier (unique)
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePropertyTypeInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePropertyTypeInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}
