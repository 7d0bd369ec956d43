//! Media repository
//!
//! Database operations for uploaded files.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::query::{self, Table};
use crate::access::Where;
use crate::db::{Backend, DynDatabasePool};
use crate::models::{ListParams, Media, NewMedia};

const MEDIA: Table = Table {
    name: "media",
    columns: "id, filename, mime_type, filesize, url, alt, uploaded_by, is_public, created_at, updated_at",
    order_by: "created_at DESC, id DESC",
};

/// Media repository trait
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Store metadata for a newly written file
    async fn create(&self, media: &NewMedia) -> Result<Media>;

    /// Get a media record by ID if it matches the access filter
    async fn find(&self, id: i64, filter: &Where) -> Result<Option<Media>>;

    /// Get a media record by stored file name if it matches the access filter
    async fn find_by_filename(&self, filename: &str, filter: &Where) -> Result<Option<Media>>;

    /// List media matching the access filter
    async fn list(&self, filter: &Where, params: &ListParams) -> Result<(Vec<Media>, i64)>;

    /// Persist editable metadata
    async fn update(&self, media: &Media) -> Result<Media>;

    /// Delete a media record if it matches the access filter
    async fn delete(&self, id: i64, filter: &Where) -> Result<bool>;
}

/// SQLx-based media repository implementation
pub struct SqlxMediaRepository {
    pool: DynDatabasePool,
}

impl SqlxMediaRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MediaRepository for SqlxMediaRepository {
    async fn create(&self, media: &NewMedia) -> Result<Media> {
        const SQL: &str = r#"
            INSERT INTO media (filename, mime_type, filesize, url, alt, uploaded_by, is_public, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();

        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SQL)
                .bind(&media.filename)
                .bind(&media.mime_type)
                .bind(media.filesize)
                .bind(&media.url)
                .bind(&media.alt)
                .bind(media.uploaded_by)
                .bind(media.is_public)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create media")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(SQL)
                .bind(&media.filename)
                .bind(&media.mime_type)
                .bind(media.filesize)
                .bind(&media.url)
                .bind(&media.alt)
                .bind(media.uploaded_by)
                .bind(media.is_public)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create media")?
                .last_insert_id() as i64,
        };

        self.find(id, &Where::all())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Media not found after insert"))
    }

    async fn find(&self, id: i64, filter: &Where) -> Result<Option<Media>> {
        query::find_by_id(&self.pool, MEDIA, id, filter).await
    }

    async fn find_by_filename(&self, filename: &str, filter: &Where) -> Result<Option<Media>> {
        let filter = Where::equals("filename", filename).and(filter.clone());
        query::find_one(&self.pool, MEDIA, &filter).await
    }

    async fn list(&self, filter: &Where, params: &ListParams) -> Result<(Vec<Media>, i64)> {
        query::find_page(&self.pool, MEDIA, filter, params).await
    }

    async fn update(&self, media: &Media) -> Result<Media> {
        const SQL: &str = "UPDATE media SET alt = ?, is_public = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();

        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SQL)
                .bind(&media.alt)
                .bind(media.is_public)
                .bind(now)
                .bind(media.id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(SQL)
                .bind(&media.alt)
                .bind(media.is_public)
                .bind(now)
                .bind(media.id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update media")?;

        self.find(media.id, &Where::all())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Media not found after update"))
    }

    async fn delete(&self, id: i64, filter: &Where) -> Result<bool> {
        let filter = Where::equals("id", id).and(filter.clone());
        Ok(query::delete_where(&self.pool, MEDIA.name, &filter).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Collection, Operation};
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{User, UserRole};

    async fn setup() -> (SqlxMediaRepository, User, User) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let admin = users
            .create(&User::new("admin@example.com".into(), "A".into(), "h".into(), UserRole::User))
            .await
            .unwrap();
        let member = users
            .create(&User::new("member@example.com".into(), "M".into(), "h".into(), UserRole::User))
            .await
            .unwrap();

        (SqlxMediaRepository::new(pool), admin, member)
    }

    fn new_media(name: &str, uploaded_by: Option<i64>, is_public: bool) -> NewMedia {
        NewMedia {
            filename: name.to_string(),
            mime_type: "image/png".to_string(),
            filesize: 42,
            url: format!("/uploads/{}", name),
            alt: None,
            uploaded_by,
            is_public,
        }
    }

    #[tokio::test]
    async fn test_anonymous_read_filter_in_sql() {
        let (repo, admin, member) = setup().await;
        repo.create(&new_media("unowned.png", None, false)).await.unwrap();
        repo.create(&new_media("public.png", Some(member.id), true)).await.unwrap();
        repo.create(&new_media("private.png", Some(member.id), false)).await.unwrap();

        let anonymous = Collection::Media
            .access(Operation::Read, None)
            .filter()
            .unwrap();
        let (docs, total) = repo.list(&anonymous, &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);
        assert!(docs.iter().all(|m| m.filename != "private.png"));

        let owner = Collection::Media
            .access(Operation::Read, Some(&member))
            .filter()
            .unwrap();
        let (_, total) = repo.list(&owner, &ListParams::default()).await.unwrap();
        assert_eq!(total, 3);

        let everything = Collection::Media
            .access(Operation::Read, Some(&admin))
            .filter()
            .unwrap();
        let (_, total) = repo.list(&everything, &ListParams::default()).await.unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_anonymous_delete_matches_nothing() {
        let (repo, _admin, member) = setup().await;
        let unowned = repo.create(&new_media("unowned.png", None, false)).await.unwrap();
        let owned = repo.create(&new_media("owned.png", Some(member.id), false)).await.unwrap();

        let anonymous = Collection::Media
            .access(Operation::Delete, None)
            .filter()
            .unwrap();
        assert!(!repo.delete(unowned.id, &anonymous).await.unwrap());
        assert!(!repo.delete(owned.id, &anonymous).await.unwrap());

        let owner = Collection::Media
            .access(Operation::Delete, Some(&member))
            .filter()
            .unwrap();
        assert!(repo.delete(owned.id, &owner).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_metadata() {
        let (repo, _admin, member) = setup().await;
        let mut media = repo.create(&new_media("a.png", Some(member.id), false)).await.unwrap();

        media.alt = Some("Front door".to_string());
        media.is_public = true;
        let updated = repo.update(&media).await.unwrap();
        assert_eq!(updated.alt.as_deref(), Some("Front door"));
        assert!(updated.is_public);
    }

    #[tokio::test]
    async fn test_find_by_filename_respects_filter() {
        let (repo, _admin, member) = setup().await;
        repo.create(&new_media("hidden.png", Some(member.id), false)).await.unwrap();

        let anonymous = Collection::Media
            .access(Operation::Read, None)
            .filter()
            .unwrap();
        assert!(repo.find_by_filename("hidden.png", &anonymous).await.unwrap().is_none());
        assert!(repo
            .find_by_filename("hidden.png", &Where::all())
            .await
            .unwrap()
            .is_some());
        assert!(repo.find_by_filename("nope.png", &Where::all()).await.unwrap().is_none());
    }
}
