//! Editorial content service
//!
//! Categories, FAQs and knowledge-base articles. Published non-draft entries
//! are public; admins manage everything. Each write revalidates the
//! sitemap of the affected collection.

use chrono::Utc;
use std::sync::Arc;

use super::error::{authorize, require_text, ContentError};
use super::sitemap::SitemapSection;
use super::slug::resolve_slug;
use crate::access::Operation;
use crate::cache::SharedCache;
use crate::db::repositories::ContentRepository;
use crate::models::{
    ContentEntry, ContentKind, CreateContentInput, ListParams, PagedResult, UpdateContentInput,
    User,
};

pub struct ContentService {
    repo: Arc<dyn ContentRepository>,
    cache: SharedCache,
}

impl ContentService {
    pub fn new(repo: Arc<dyn ContentRepository>, cache: SharedCache) -> Self {
        Self { repo, cache }
    }

    pub async fn create(
        &self,
        kind: ContentKind,
        input: CreateContentInput,
        requester: Option<&User>,
    ) -> Result<ContentEntry, ContentError> {
        authorize(kind.collection(), Operation::Create, requester)?;

        let title = input.title.trim().to_string();
        require_text("Title", &title)?;

        let slug = resolve_slug(input.slug.as_deref(), &title);
        require_text("Slug", &slug)?;
        if self.repo.slug_exists(kind, &slug, None).await? {
            return Err(ContentError::Conflict(format!("Slug already exists: {}", slug)));
        }

        let entry = ContentEntry {
            id: 0,
            title,
            slug,
            body: input.body,
            published: input.published,
            is_draft: input.is_draft,
            created_at: Utc::now(),
            updated_at: None,
        };

        let created = self.repo.create(kind, &entry).await?;
        tracing::info!(kind = kind.table(), id = created.id, "Created {}", kind.label());
        self.revalidate(kind).await;
        Ok(created)
    }

    pub async fn get(
        &self,
        kind: ContentKind,
        id: i64,
        requester: Option<&User>,
    ) -> Result<ContentEntry, ContentError> {
        let filter = authorize(kind.collection(), Operation::Read, requester)?;
        self.repo
            .find(kind, id, &filter)
            .await?
            .ok_or(ContentError::NotFound(kind.label()))
    }

    pub async fn list(
        &self,
        kind: ContentKind,
        requester: Option<&User>,
        params: &ListParams,
    ) -> Result<PagedResult<ContentEntry>, ContentError> {
        let filter = authorize(kind.collection(), Operation::Read, requester)?;
        let (docs, total) = self.repo.list(kind, &filter, params).await?;
        Ok(PagedResult::new(docs, total, params))
    }

    pub async fn update(
        &self,
        kind: ContentKind,
        id: i64,
        input: UpdateContentInput,
        requester: Option<&User>,
    ) -> Result<ContentEntry, ContentError> {
        let filter = authorize(kind.collection(), Operation::Update, requester)?;
        let mut entry = self
            .repo
            .find(kind, id, &filter)
            .await?
            .ok_or(ContentError::NotFound(kind.label()))?;

        if let Some(title) = input.title {
            let title = title.trim().to_string();
            require_text("Title", &title)?;
            entry.title = title;
        }
        if let Some(slug) = input.slug {
            let slug = resolve_slug(Some(&slug), &entry.title);
            require_text("Slug", &slug)?;
            if slug != entry.slug && self.repo.slug_exists(kind, &slug, Some(id)).await? {
                return Err(ContentError::Conflict(format!("Slug already exists: {}", slug)));
            }
            entry.slug = slug;
        }
        if let Some(body) = input.body {
            entry.body = body;
        }
        if let Some(published) = input.published {
            entry.published = published;
        }
        if let Some(is_draft) = input.is_draft {
            entry.is_draft = is_draft;
        }

        let updated = self.repo.update(kind, &entry).await?;
        self.revalidate(kind).await;
        Ok(updated)
    }

    pub async fn delete(
        &self,
        kind: ContentKind,
        id: i64,
        requester: Option<&User>,
    ) -> Result<(), ContentError> {
        let filter = authorize(kind.collection(), Operation::Delete, requester)?;
        if self.repo.find(kind, id, &filter).await?.is_none() || !self.repo.delete(kind, id).await? {
            return Err(ContentError::NotFound(kind.label()));
        }
        self.revalidate(kind).await;
        Ok(())
    }

    async fn revalidate(&self, kind: ContentKind) {
        let tag = SitemapSection::from(kind).tag();
        if let Err(e) = self.cache.revalidate_tag(tag).await {
            tracing::warn!("Failed to revalidate {}: {}", tag, e);
        }
    }
}
