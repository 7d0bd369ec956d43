//! Media service
//!
//! Stores uploaded files on disk under the configured upload directory and
//! keeps their metadata in the `media` collection. Every operation goes
//! through the media access predicate.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

use super::error::{authorize, ContentError};
use crate::access::{Collection, Operation};
use crate::config::UploadConfig;
use crate::db::repositories::MediaRepository;
use crate::models::{ListParams, Media, NewMedia, PagedResult, UpdateMediaInput, User};

/// A file received from a client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name the client gave the file
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub alt: Option<String>,
    pub is_public: bool,
}

/// Media service
pub struct MediaService {
    repo: Arc<dyn MediaRepository>,
    config: UploadConfig,
}

impl MediaService {
    pub fn new(repo: Arc<dyn MediaRepository>, config: UploadConfig) -> Self {
        Self { repo, config }
    }

    /// Validate, store and register an uploaded file
    pub async fn upload(
        &self,
        file: UploadedFile,
        requester: Option<&User>,
    ) -> Result<Media, ContentError> {
        authorize(Collection::Media, Operation::Create, requester)?;

        if !self.config.is_type_allowed(&file.content_type) {
            return Err(ContentError::ValidationError(format!(
                "Invalid file type: {}. Allowed types: {}",
                file.content_type,
                self.config.allowed_types.join(", ")
            )));
        }
        if file.data.is_empty() {
            return Err(ContentError::ValidationError("File is empty".to_string()));
        }
        if file.data.len() as u64 > self.config.max_file_size {
            return Err(ContentError::ValidationError(format!(
                "File too large. Maximum size: {} bytes",
                self.config.max_file_size
            )));
        }

        fs::create_dir_all(&self.config.path)
            .await
            .with_context(|| format!("Failed to create upload dir: {:?}", self.config.path))?;

        let extension = extension_for(&file.original_name, self.config.get_extension(&file.content_type));
        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.file_path(&filename);

        fs::write(&path, &file.data)
            .await
            .with_context(|| format!("Failed to save file: {:?}", path))?;

        let new_media = NewMedia {
            url: format!("/uploads/{}", filename),
            filename,
            mime_type: file.content_type,
            filesize: file.data.len() as i64,
            alt: file.alt.filter(|a| !a.trim().is_empty()),
            uploaded_by: requester.map(|u| u.id),
            is_public: file.is_public,
        };

        match self.repo.create(&new_media).await {
            Ok(media) => {
                tracing::info!(media_id = media.id, filename = %media.filename, "Stored upload");
                Ok(media)
            }
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&path).await {
                    tracing::warn!("Failed to remove orphaned upload {:?}: {}", path, remove_err);
                }
                Err(e.context("Failed to record upload").into())
            }
        }
    }

    pub async fn get(&self, id: i64, requester: Option<&User>) -> Result<Media, ContentError> {
        let filter = authorize(Collection::Media, Operation::Read, requester)?;
        self.repo
            .find(id, &filter)
            .await?
            .ok_or(ContentError::NotFound("Media"))
    }

    pub async fn list(
        &self,
        requester: Option<&User>,
        params: &ListParams,
    ) -> Result<PagedResult<Media>, ContentError> {
        let filter = authorize(Collection::Media, Operation::Read, requester)?;
        let (docs, total) = self.repo.list(&filter, params).await?;
        Ok(PagedResult::new(docs, total, params))
    }

    /// Stored file contents of a media record visible to the requester
    pub async fn file(
        &self,
        filename: &str,
        requester: Option<&User>,
    ) -> Result<(Media, Vec<u8>), ContentError> {
        let filter = authorize(Collection::Media, Operation::Read, requester)?;
        let media = self
            .repo
            .find_by_filename(filename, &filter)
            .await?
            .ok_or(ContentError::NotFound("Media"))?;

        let path = self.file_path(&media.filename);
        let data = fs::read(&path)
            .await
            .with_context(|| format!("Failed to read media file: {:?}", path))?;
        Ok((media, data))
    }

    /// Update alt text and visibility
    pub async fn update(
        &self,
        id: i64,
        input: UpdateMediaInput,
        requester: Option<&User>,
    ) -> Result<Media, ContentError> {
        let filter = authorize(Collection::Media, Operation::Update, requester)?;
        let mut media = self
            .repo
            .find(id, &filter)
            .await?
            .ok_or(ContentError::NotFound("Media"))?;

        if let Some(alt) = input.alt {
            media.alt = if alt.trim().is_empty() { None } else { Some(alt) };
        }
        if let Some(is_public) = input.is_public {
            media.is_public = is_public;
        }

        Ok(self.repo.update(&media).await?)
    }

    /// Delete the record and its file
    pub async fn delete(&self, id: i64, requester: Option<&User>) -> Result<(), ContentError> {
        let filter = authorize(Collection::Media, Operation::Delete, requester)?;
        let media = self
            .repo
            .find(id, &filter)
            .await?
            .ok_or(ContentError::NotFound("Media"))?;

        if !self.repo.delete(id, &filter).await? {
            return Err(ContentError::NotFound("Media"));
        }

        let path = self.file_path(&media.filename);
        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!("Failed to remove media file {:?}: {}", path, e);
        }

        Ok(())
    }

    fn file_path(&self, filename: &str) -> PathBuf {
        self.config.path.join(filename)
    }
}

/// Extension from the client's file name, else the one for its MIME type
fn extension_for(original_name: &str, fallback: &str) -> String {
    match original_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() < 10
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_lowercase()
        }
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxMediaRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;
    use tempfile::TempDir;

    struct Fixture {
        service: MediaService,
        admin: User,
        member: User,
        other: User,
        dir: TempDir,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut created = Vec::new();
        for email in ["admin@example.com", "member@example.com", "other@example.com"] {
            created.push(
                users
                    .create(&User::new(email.into(), "U".into(), "h".into(), UserRole::User))
                    .await
                    .unwrap(),
            );
        }
        let other = created.pop().unwrap();
        let member = created.pop().unwrap();
        let admin = created.pop().unwrap();

        let dir = TempDir::new().unwrap();
        let config = UploadConfig {
            path: dir.path().join("uploads"),
            ..UploadConfig::default()
        };

        Fixture {
            service: MediaService::new(SqlxMediaRepository::boxed(pool), config),
            admin,
            member,
            other,
            dir,
        }
    }

    fn png(is_public: bool) -> UploadedFile {
        UploadedFile {
            original_name: "photo.PNG".to_string(),
            content_type: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
            alt: Some("Living room".to_string()),
            is_public,
        }
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_record() {
        let f = setup().await;
        let media = f.service.upload(png(false), Some(&f.member)).await.unwrap();

        assert!(media.filename.ends_with(".png"));
        assert_eq!(media.uploaded_by, Some(f.member.id));
        assert_eq!(media.filesize, 4);
        assert!(f.dir.path().join("uploads").join(&media.filename).exists());
    }

    #[tokio::test]
    async fn test_upload_requires_login_and_allowed_type() {
        let f = setup().await;
        assert!(matches!(
            f.service.upload(png(true), None).await,
            Err(ContentError::Unauthorized)
        ));

        let mut exe = png(true);
        exe.content_type = "application/x-msdownload".to_string();
        assert!(matches!(
            f.service.upload(exe, Some(&f.member)).await,
            Err(ContentError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_private_media_visible_to_owner_and_admin_only() {
        let f = setup().await;
        let media = f.service.upload(png(false), Some(&f.member)).await.unwrap();

        assert!(f.service.get(media.id, Some(&f.member)).await.is_ok());
        assert!(f.service.get(media.id, Some(&f.admin)).await.is_ok());
        assert!(matches!(
            f.service.get(media.id, Some(&f.other)).await,
            Err(ContentError::NotFound(_))
        ));
        assert!(matches!(
            f.service.get(media.id, None).await,
            Err(ContentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_public_media_visible_to_anonymous() {
        let f = setup().await;
        let media = f.service.upload(png(true), Some(&f.member)).await.unwrap();
        assert!(f.service.get(media.id, None).await.is_ok());

        let page = f.service.list(None, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);

        let (found, data) = f.service.file(&media.filename, None).await.unwrap();
        assert_eq!(found.id, media.id);
        assert_eq!(data, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_private_file_hidden_from_anonymous() {
        let f = setup().await;
        let media = f.service.upload(png(false), Some(&f.member)).await.unwrap();
        assert!(matches!(
            f.service.file(&media.filename, None).await,
            Err(ContentError::NotFound(_))
        ));
        assert!(f.service.file(&media.filename, Some(&f.member)).await.is_ok());
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_mutates() {
        let f = setup().await;
        let media = f.service.upload(png(false), Some(&f.member)).await.unwrap();

        let input = UpdateMediaInput {
            is_public: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            f.service.update(media.id, input.clone(), Some(&f.other)).await,
            Err(ContentError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete(media.id, None).await,
            Err(ContentError::NotFound(_))
        ));

        let updated = f.service.update(media.id, input, Some(&f.member)).await.unwrap();
        assert!(updated.is_public);

        f.service.delete(media.id, Some(&f.admin)).await.unwrap();
        assert!(!f.dir.path().join("uploads").join(&media.filename).exists());
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("house.JPEG", "jpg"), "jpeg");
        assert_eq!(extension_for("noext", "png"), "png");
        assert_eq!(extension_for(".hidden", "bin"), "bin");
        assert_eq!(extension_for("evil.p/hp", "bin"), "bin");
    }
}
