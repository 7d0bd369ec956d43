//! Sitemap projection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two columns a sitemap needs from any published document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SitemapRecord {
    pub slug: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}
