//! Property type service
//!
//! Property types are reference data: anyone may read them, only admins
//! manage them. Names and slugs are unique.

use anyhow::Context;
use std::sync::Arc;

use super::error::{authorize, require_text, ContentError};
use super::slug::resolve_slug;
use crate::access::{Collection, Operation};
use crate::db::repositories::PropertyTypeRepository;
use crate::models::{
    CreatePropertyTypeInput, ListParams, PagedResult, PropertyType, UpdatePropertyTypeInput, User,
};

/// Property type service
pub struct PropertyTypeService {
    repo: Arc<dyn PropertyTypeRepository>,
}

impl PropertyTypeService {
    pub fn new(repo: Arc<dyn PropertyTypeRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<PropertyType>, ContentError> {
        let (docs, total) = self.repo.list(params).await?;
        Ok(PagedResult::new(docs, total, params))
    }

    pub async fn get(&self, id: i64) -> Result<PropertyType, ContentError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(ContentError::NotFound("Property type"))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<PropertyType>, ContentError> {
        Ok(self.repo.get_by_slug(slug).await?)
    }

    pub async fn create(
        &self,
        input: CreatePropertyTypeInput,
        requester: Option<&User>,
    ) -> Result<PropertyType, ContentError> {
        authorize(Collection::PropertyTypes, Operation::Create, requester)?;
        self.insert(input).await
    }

    /// Insert without an access check; used by the seed routine
    pub(crate) async fn insert(&self, input: CreatePropertyTypeInput) -> Result<PropertyType, ContentError> {
        let name = input.name.trim().to_string();
        require_text("Name", &name)?;

        let slug = resolve_slug(input.slug.as_deref(), &name);
        require_text("Slug", &slug)?;

        if self.repo.get_by_name(&name).await?.is_some() {
            return Err(ContentError::Conflict(format!(
                "Property type name already exists: {}",
                name
            )));
        }
        if self.repo.get_by_slug(&slug).await?.is_some() {
            return Err(ContentError::Conflict(format!(
                "Property type slug already exists: {}",
                slug
            )));
        }

        let description = input.description.as_deref().filter(|d| !d.trim().is_empty());
        let created = self
            .repo
            .create(&name, &slug, description)
            .await
            .context("Failed to create property type")?;

        tracing::info!(id = created.id, slug = %created.slug, "Created property type");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdatePropertyTypeInput,
        requester: Option<&User>,
    ) -> Result<PropertyType, ContentError> {
        authorize(Collection::PropertyTypes, Operation::Update, requester)?;
        let mut property_type = self.get(id).await?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            require_text("Name", &name)?;
            if name != property_type.name {
                if let Some(existing) = self.repo.get_by_name(&name).await? {
                    if existing.id != id {
                        return Err(ContentError::Conflict(format!(
                            "Property type name already exists: {}",
                            name
                        )));
                    }
                }
            }
            property_type.name = name;
        }

        if let Some(slug) = input.slug {
            let slug = resolve_slug(Some(&slug), &property_type.name);
            require_text("Slug", &slug)?;
            if let Some(existing) = self.repo.get_by_slug(&slug).await? {
                if existing.id != id {
                    return Err(ContentError::Conflict(format!(
                        "Property type slug already exists: {}",
                        slug
                    )));
                }
            }
            property_type.slug = slug;
        }

        if let Some(description) = input.description {
            property_type.description = if description.trim().is_empty() {
                None
            } else {
                Some(description)
            };
        }

        Ok(self.repo.update(&property_type).await?)
    }

    pub async fn delete(&self, id: i64, requester: Option<&User>) -> Result<(), ContentError> {
        authorize(Collection::PropertyTypes, Operation::Delete, requester)?;
        if !self.repo.delete(id).await? {
            return Err(ContentError::NotFound("Property type"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxPropertyTypeRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    async fn setup() -> PropertyTypeService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        PropertyTypeService::new(SqlxPropertyTypeRepository::boxed(pool))
    }

    fn user(role: UserRole) -> User {
        let mut u = User::new("t@example.com".into(), "T".into(), "h".into(), role);
        u.id = 1;
        u
    }

    fn input(name: &str) -> CreatePropertyTypeInput {
        CreatePropertyTypeInput {
            name: name.to_string(),
            slug: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_admin_creates_with_generated_slug() {
        let service = setup().await;
        let admin = user(UserRole::Admin);
        let created = service.create(input("Beach House"), Some(&admin)).await.unwrap();
        assert_eq!(created.slug, "beach-house");
        assert!(service.get_by_slug("beach-house").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_non_admin_cannot_manage() {
        let service = setup().await;
        assert!(matches!(
            service.create(input("Loft"), None).await,
            Err(ContentError::Unauthorized)
        ));
        assert!(matches!(
            service.create(input("Loft"), Some(&user(UserRole::Agent))).await,
            Err(ContentError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicates_conflict() {
        let service = setup().await;
        let admin = user(UserRole::Admin);
        service.create(input("Loft"), Some(&admin)).await.unwrap();

        assert!(matches!(
            service.create(input("Loft"), Some(&admin)).await,
            Err(ContentError::Conflict(_))
        ));
        let same_slug = CreatePropertyTypeInput {
            name: "Loft Space".into(),
            slug: Some("loft".into()),
            description: None,
        };
        assert!(matches!(
            service.create(same_slug, Some(&admin)).await,
            Err(ContentError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = setup().await;
        let admin = user(UserRole::Admin);
        let created = service.create(input("Cabin"), Some(&admin)).await.unwrap();

        let updated = service
            .update(
                created.id,
                UpdatePropertyTypeInput {
                    description: Some("Small wooden house".into()),
                    ..Default::default()
                },
                Some(&admin),
            )
            .await
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("Small wooden house"));

        service.delete(created.id, Some(&admin)).await.unwrap();
        assert!(matches!(
            service.get(created.id).await,
            Err(ContentError::NotFound(_))
        ));
    }
}
