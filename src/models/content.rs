//! Editorial content models
//!
//! Categories, FAQs and knowledge-base articles share one document shape and
//! live in separate tables. For FAQs `title` holds the question and `body`
//! the answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{Collection, Document, Value};

/// Which editorial collection a document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Category,
    Faq,
    KnowledgeBase,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::Category,
        ContentKind::Faq,
        ContentKind::KnowledgeBase,
    ];

    /// Backing table
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Category => "categories",
            ContentKind::Faq => "faqs",
            ContentKind::KnowledgeBase => "knowledge_base_articles",
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            ContentKind::Category => Collection::Categories,
            ContentKind::Faq => Collection::Faqs,
            ContentKind::KnowledgeBase => Collection::KnowledgeBase,
        }
    }

    /// Human-readable singular name for messages
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Category => "Category",
            ContentKind::Faq => "FAQ",
            ContentKind::KnowledgeBase => "Article",
        }
    }
}

/// A category, FAQ or knowledge-base article
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentEntry {
    pub id: i64,
    pub title: String,
    /// URL-friendly identifier (unique per collection)
    pub slug: String,
    pub body: String,
    pub published: bool,
    /// Unpublished working copy
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContentEntry {
    pub fn is_public(&self) -> bool {
        self.published && !self.is_draft
    }
}

impl Document for ContentEntry {
    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.into(),
            "slug" => self.slug.as_str().into(),
            "published" => self.published.into(),
            "is_draft" => self.is_draft.into(),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContentInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContentInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub body: Option<String>,
    pub published: Option<bool>,
    pub is_draft: Option<bool>,
}
