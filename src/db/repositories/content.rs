//! Editorial content repository
//!
//! Categories, FAQs and knowledge-base articles share one table layout, so a
//! single repository serves all three, parameterised by [`ContentKind`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::query::{self, Table};
use crate::access::Where;
use crate::db::{Backend, DynDatabasePool};
use crate::models::{ContentEntry, ContentKind, ListParams, SitemapRecord};

const COLUMNS: &str = "id, title, slug, body, published, is_draft, created_at, updated_at";

fn table(kind: ContentKind) -> Table {
    Table {
        name: kind.table(),
        columns: COLUMNS,
        order_by: "created_at DESC, id DESC",
    }
}

/// Content repository trait
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Insert an entry; `id` and timestamps on the input are ignored
    async fn create(&self, kind: ContentKind, entry: &ContentEntry) -> Result<ContentEntry>;

    async fn find(&self, kind: ContentKind, id: i64, filter: &Where) -> Result<Option<ContentEntry>>;

    async fn list(
        &self,
        kind: ContentKind,
        filter: &Where,
        params: &ListParams,
    ) -> Result<(Vec<ContentEntry>, i64)>;

    /// Persist every editable column and stamp `updated_at`
    async fn update(&self, kind: ContentKind, entry: &ContentEntry) -> Result<ContentEntry>;

    async fn delete(&self, kind: ContentKind, id: i64) -> Result<bool>;

    async fn slug_exists(&self, kind: ContentKind, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    async fn sitemap_records(&self, kind: ContentKind, filter: &Where) -> Result<Vec<SitemapRecord>>;
}

/// SQLx-based content repository implementation
pub struct SqlxContentRepository {
    pool: DynDatabasePool,
}

impl SqlxContentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContentRepository for SqlxContentRepository {
    async fn create(&self, kind: ContentKind, entry: &ContentEntry) -> Result<ContentEntry> {
        let sql = format!(
            "INSERT INTO {} (title, slug, body, published, is_draft, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            kind.table()
        );
        let now = Utc::now();

        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(&entry.title)
                .bind(&entry.slug)
                .bind(&entry.body)
                .bind(entry.published)
                .bind(entry.is_draft)
                .bind(now)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to create {}", kind.label()))?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(&entry.title)
                .bind(&entry.slug)
                .bind(&entry.body)
                .bind(entry.published)
                .bind(entry.is_draft)
                .bind(now)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to create {}", kind.label()))?
                .last_insert_id() as i64,
        };

        self.find(kind, id, &Where::all())
            .await?
            .ok_or_else(|| anyhow::anyhow!("{} not found after insert", kind.label()))
    }

    async fn find(&self, kind: ContentKind, id: i64, filter: &Where) -> Result<Option<ContentEntry>> {
        query::find_by_id(&self.pool, table(kind), id, filter).await
    }

    async fn list(
        &self,
        kind: ContentKind,
        filter: &Where,
        params: &ListParams,
    ) -> Result<(Vec<ContentEntry>, i64)> {
        query::find_page(&self.pool, table(kind), filter, params).await
    }

    async fn update(&self, kind: ContentKind, entry: &ContentEntry) -> Result<ContentEntry> {
        let sql = format!(
            "UPDATE {} SET title = ?, slug = ?, body = ?, published = ?, is_draft = ?, updated_at = ? WHERE id = ?",
            kind.table()
        );
        let now = Utc::now();

        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(&entry.title)
                .bind(&entry.slug)
                .bind(&entry.body)
                .bind(entry.published)
                .bind(entry.is_draft)
                .bind(now)
                .bind(entry.id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(&entry.title)
                .bind(&entry.slug)
                .bind(&entry.body)
                .bind(entry.published)
                .bind(entry.is_draft)
                .bind(now)
                .bind(entry.id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .with_context(|| format!("Failed to update {}", kind.label()))?;

        self.find(kind, entry.id, &Where::all())
            .await?
            .ok_or_else(|| anyhow::anyhow!("{} not found after update", kind.label()))
    }

    async fn delete(&self, kind: ContentKind, id: i64) -> Result<bool> {
        Ok(query::delete_where(&self.pool, kind.table(), &Where::equals("id", id)).await? > 0)
    }

    async fn slug_exists(&self, kind: ContentKind, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let found: Option<ContentEntry> =
            query::find_one(&self.pool, table(kind), &Where::equals("slug", slug)).await?;
        Ok(found.is_some_and(|e| Some(e.id) != exclude_id))
    }

    async fn sitemap_records(&self, kind: ContentKind, filter: &Where) -> Result<Vec<SitemapRecord>> {
        query::sitemap_records(&self.pool, kind.table(), filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxContentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxContentRepository::new(pool)
    }

    fn entry(slug: &str, published: bool, is_draft: bool) -> ContentEntry {
        ContentEntry {
            id: 0,
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            body: "Body".to_string(),
            published,
            is_draft,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_kinds_are_separate_tables() {
        let repo = setup().await;
        repo.create(ContentKind::Faq, &entry("shared", true, false)).await.unwrap();
        repo.create(ContentKind::Category, &entry("shared", true, false)).await.unwrap();

        let (_, faqs) = repo
            .list(ContentKind::Faq, &Where::all(), &ListParams::default())
            .await
            .unwrap();
        let (_, articles) = repo
            .list(ContentKind::KnowledgeBase, &Where::all(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(faqs, 1);
        assert_eq!(articles, 0);
    }

    #[tokio::test]
    async fn test_public_filter_hides_drafts_and_unpublished() {
        let repo = setup().await;
        let kind = ContentKind::KnowledgeBase;
        repo.create(kind, &entry("live", true, false)).await.unwrap();
        repo.create(kind, &entry("draft", true, true)).await.unwrap();
        repo.create(kind, &entry("hidden", false, false)).await.unwrap();

        let public = Where::equals("published", true).and(Where::equals("is_draft", false));
        let records = repo.sitemap_records(kind, &public).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slug.as_deref(), Some("live"));
        assert!(records[0].updated_at.is_none());
    }

    #[tokio::test]
    async fn test_update_stamps_updated_at() {
        let repo = setup().await;
        let mut created = repo
            .create(ContentKind::Category, &entry("homes", true, false))
            .await
            .unwrap();
        assert!(created.updated_at.is_none());

        created.title = "Homes".to_string();
        let updated = repo.update(ContentKind::Category, &created).await.unwrap();
        assert_eq!(updated.title, "Homes");
        assert!(updated.updated_at.is_some());
        assert!(repo.slug_exists(ContentKind::Category, "homes", None).await.unwrap());
    }
}
