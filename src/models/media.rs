//! Media model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{Document, Value};

/// An uploaded file
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Media {
    pub id: i64,
    /// Stored file name (unique, generated on upload)
    pub filename: String,
    pub mime_type: String,
    /// Size in bytes
    pub filesize: i64,
    /// Public URL the file is served from
    pub url: String,
    /// Alternative text
    pub alt: Option<String>,
    /// Uploader, `None` for files not owned by any user
    pub uploaded_by: Option<i64>,
    /// Readable by everyone regardless of owner
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Media {
    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.into(),
            "filename" => self.filename.as_str().into(),
            "uploaded_by" => self.uploaded_by.into(),
            "is_public" => self.is_public.into(),
            _ => Value::Null,
        }
    }
}

/// Data for a newly stored file
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filename: String,
    pub mime_type: String,
    pub filesize: i64,
    pub url: String,
    pub alt: Option<String>,
    pub uploaded_by: Option<i64>,
    pub is_public: bool,
}

/// Editable media metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMediaInput {
    pub alt: Option<String>,
    pub is_public: Option<bool>,
}
