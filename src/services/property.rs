//! Property listing service
//!
//! Listings are created by any logged-in user and start out pending; only
//! admins move them through moderation. Writes revalidate the properties
//! sitemap.

use std::sync::Arc;

use super::error::{authorize, require_text, ContentError};
use super::sitemap::SitemapSection;
use super::slug::resolve_slug;
use crate::access::{Collection, Operation};
use crate::cache::SharedCache;
use crate::db::repositories::{PropertyRepository, PropertyTypeRepository};
use crate::models::{
    CreatePropertyInput, ListParams, PagedResult, Property, PropertyStatus, UpdatePropertyInput,
    User,
};
use chrono::Utc;

/// Property service
pub struct PropertyService {
    repo: Arc<dyn PropertyRepository>,
    types: Arc<dyn PropertyTypeRepository>,
    cache: SharedCache,
}

impl PropertyService {
    pub fn new(
        repo: Arc<dyn PropertyRepository>,
        types: Arc<dyn PropertyTypeRepository>,
        cache: SharedCache,
    ) -> Self {
        Self { repo, types, cache }
    }

    pub async fn create(
        &self,
        input: CreatePropertyInput,
        requester: Option<&User>,
    ) -> Result<Property, ContentError> {
        authorize(Collection::Properties, Operation::Create, requester)?;

        let title = input.title.trim().to_string();
        require_text("Title", &title)?;
        validate_figures(input.price, input.bedrooms, input.bathrooms, input.area)?;
        self.check_property_type(input.property_type_id).await?;

        let slug = resolve_slug(input.slug.as_deref(), &title);
        require_text("Slug", &slug)?;
        if self.repo.slug_exists(&slug, None).await? {
            return Err(ContentError::Conflict(format!("Slug already exists: {}", slug)));
        }

        let is_admin = requester.is_some_and(User::is_admin);
        let status = match input.status {
            Some(status) if is_admin => status,
            _ => PropertyStatus::Pending,
        };

        let property = Property {
            id: 0,
            title,
            slug,
            description: input.description,
            price: input.price,
            address: input.address,
            city: input.city,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            area: input.area,
            property_type_id: input.property_type_id,
            owner_id: requester.map(|u| u.id),
            status,
            is_draft: input.is_draft,
            created_at: Utc::now(),
            updated_at: None,
        };

        let created = self.repo.create(&property).await?;
        tracing::info!(id = created.id, slug = %created.slug, "Created property");
        self.revalidate().await;
        Ok(created)
    }

    pub async fn get(&self, id: i64, requester: Option<&User>) -> Result<Property, ContentError> {
        let filter = authorize(Collection::Properties, Operation::Read, requester)?;
        self.repo
            .find(id, &filter)
            .await?
            .ok_or(ContentError::NotFound("Property"))
    }

    pub async fn list(
        &self,
        requester: Option<&User>,
        params: &ListParams,
    ) -> Result<PagedResult<Property>, ContentError> {
        let filter = authorize(Collection::Properties, Operation::Read, requester)?;
        let (docs, total) = self.repo.list(&filter, params).await?;
        Ok(PagedResult::new(docs, total, params))
    }

    /// Update a listing. A status change from a non-admin is ignored.
    pub async fn update(
        &self,
        id: i64,
        input: UpdatePropertyInput,
        requester: Option<&User>,
    ) -> Result<Property, ContentError> {
        let filter = authorize(Collection::Properties, Operation::Update, requester)?;
        let mut property = self
            .repo
            .find(id, &filter)
            .await?
            .ok_or(ContentError::NotFound("Property"))?;

        if let Some(title) = input.title {
            let title = title.trim().to_string();
            require_text("Title", &title)?;
            property.title = title;
        }
        if let Some(slug) = input.slug {
            let slug = resolve_slug(Some(&slug), &property.title);
            require_text("Slug", &slug)?;
            if slug != property.slug && self.repo.slug_exists(&slug, Some(id)).await? {
                return Err(ContentError::Conflict(format!("Slug already exists: {}", slug)));
            }
            property.slug = slug;
        }
        if let Some(description) = input.description {
            property.description = description;
        }
        if let Some(price) = input.price {
            property.price = price;
        }
        if let Some(address) = input.address {
            property.address = address;
        }
        if let Some(city) = input.city {
            property.city = city;
        }
        if let Some(bedrooms) = input.bedrooms {
            property.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = input.bathrooms {
            property.bathrooms = bathrooms;
        }
        if let Some(area) = input.area {
            property.area = area;
        }
        if input.property_type_id.is_some() {
            self.check_property_type(input.property_type_id).await?;
            property.property_type_id = input.property_type_id;
        }
        if let Some(is_draft) = input.is_draft {
            property.is_draft = is_draft;
        }
        if let Some(status) = input.status {
            if requester.is_some_and(User::is_admin) {
                property.status = status;
            }
        }

        validate_figures(property.price, property.bedrooms, property.bathrooms, property.area)?;

        let updated = self.repo.update(&property).await?;
        self.revalidate().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, requester: Option<&User>) -> Result<(), ContentError> {
        let filter = authorize(Collection::Properties, Operation::Delete, requester)?;
        if !self.repo.delete(id, &filter).await? {
            return Err(ContentError::NotFound("Property"));
        }
        tracing::info!(id, "Deleted property");
        self.revalidate().await;
        Ok(())
    }

    /// A referenced property type must exist
    async fn check_property_type(&self, id: Option<i64>) -> Result<(), ContentError> {
        let Some(id) = id else {
            return Ok(());
        };
        if self.types.get_by_id(id).await?.is_none() {
            return Err(ContentError::ValidationError(format!(
                "Unknown property type: {}",
                id
            )));
        }
        Ok(())
    }

    async fn revalidate(&self) {
        if let Err(e) = self.cache.revalidate_tag(SitemapSection::Properties.tag()).await {
            tracing::warn!("Failed to revalidate properties sitemap: {}", e);
        }
    }
}

fn validate_figures(price: i64, bedrooms: i32, bathrooms: i32, area: f64) -> Result<(), ContentError> {
    if price < 0 {
        return Err(ContentError::ValidationError("Price cannot be negative".to_string()));
    }
    if bedrooms < 0 || bathrooms < 0 {
        return Err(ContentError::ValidationError(
            "Room counts cannot be negative".to_string(),
        ));
    }
    if !area.is_finite() || area < 0.0 {
        return Err(ContentError::ValidationError("Area must be a positive number".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{
        SqlxPropertyRepository, SqlxPropertyTypeRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    struct Fixture {
        service: PropertyService,
        cache: SharedCache,
        types: Arc<dyn PropertyTypeRepository>,
        admin: User,
        agent: User,
        other: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        // The first stored user is promoted to admin.
        let users = SqlxUserRepository::new(pool.clone());
        let admin = users
            .create(&User::new("a@example.com".into(), "A".into(), "h".into(), UserRole::User))
            .await
            .unwrap();
        let agent = users
            .create(&User::new("g@example.com".into(), "G".into(), "h".into(), UserRole::Agent))
            .await
            .unwrap();
        let other = users
            .create(&User::new("o@example.com".into(), "O".into(), "h".into(), UserRole::Agent))
            .await
            .unwrap();

        let cache = create_cache(&CacheConfig::default());
        let types = SqlxPropertyTypeRepository::boxed(pool.clone());
        Fixture {
            service: PropertyService::new(
                SqlxPropertyRepository::boxed(pool),
                types.clone(),
                cache.clone(),
            ),
            cache,
            types,
            admin,
            agent,
            other,
        }
    }

    fn input(title: &str) -> CreatePropertyInput {
        CreatePropertyInput {
            title: title.to_string(),
            slug: None,
            description: "Bright and quiet".to_string(),
            price: 320_000,
            address: "5 Rua Augusta".to_string(),
            city: "Lisbon".to_string(),
            bedrooms: 3,
            bathrooms: 2,
            area: 110.0,
            property_type_id: None,
            status: Some(PropertyStatus::Approved),
            is_draft: false,
        }
    }

    #[tokio::test]
    async fn test_member_listing_starts_pending() {
        let f = setup().await;
        assert_eq!(f.admin.role, UserRole::Admin);
        let created = f.service.create(input("Sea View Flat"), Some(&f.agent)).await.unwrap();

        assert_eq!(created.slug, "sea-view-flat");
        assert_eq!(created.status, PropertyStatus::Pending);
        assert_eq!(created.owner_id, Some(f.agent.id));

        // Pending listings stay hidden from the public but not from the owner.
        assert!(matches!(
            f.service.get(created.id, None).await,
            Err(ContentError::NotFound(_))
        ));
        assert!(f.service.get(created.id, Some(&f.agent)).await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_sets_status() {
        let f = setup().await;
        let created = f.service.create(input("Villa"), Some(&f.admin)).await.unwrap();
        assert_eq!(created.status, PropertyStatus::Approved);
        assert!(f.service.get(created.id, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_anonymous_cannot_create() {
        let f = setup().await;
        assert!(matches!(
            f.service.create(input("Villa"), None).await,
            Err(ContentError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let f = setup().await;
        f.service.create(input("Loft"), Some(&f.agent)).await.unwrap();
        assert!(matches!(
            f.service.create(input("Loft"), Some(&f.agent)).await,
            Err(ContentError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_only_owner_updates_and_status_ignored() {
        let f = setup().await;
        let created = f.service.create(input("Cottage"), Some(&f.agent)).await.unwrap();

        let change = UpdatePropertyInput {
            price: Some(300_000),
            status: Some(PropertyStatus::Approved),
            ..Default::default()
        };
        assert!(matches!(
            f.service.update(created.id, change.clone(), Some(&f.other)).await,
            Err(ContentError::NotFound(_))
        ));

        let updated = f.service.update(created.id, change, Some(&f.agent)).await.unwrap();
        assert_eq!(updated.price, 300_000);
        assert_eq!(updated.status, PropertyStatus::Pending);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let f = setup().await;
        let mut bad = input("Bad");
        bad.price = -1;
        assert!(matches!(
            f.service.create(bad, Some(&f.agent)).await,
            Err(ContentError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_property_type_rejected() {
        let f = setup().await;
        let mut listing = input("Townhouse");
        listing.property_type_id = Some(999);
        assert!(matches!(
            f.service.create(listing, Some(&f.agent)).await,
            Err(ContentError::ValidationError(_))
        ));

        let house = f.types.create("House", "house", None).await.unwrap();
        let mut listing = input("Townhouse");
        listing.property_type_id = Some(house.id);
        let created = f.service.create(listing, Some(&f.agent)).await.unwrap();
        assert_eq!(created.property_type_id, Some(house.id));

        let change = UpdatePropertyInput {
            property_type_id: Some(999),
            ..Default::default()
        };
        assert!(matches!(
            f.service.update(created.id, change, Some(&f.agent)).await,
            Err(ContentError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_writes_revalidate_sitemap_tag() {
        let f = setup().await;
        let tag = SitemapSection::Properties.tag();
        let stale = vec!["stale".to_string()];
        let cached = |f: &Fixture| {
            let cache = f.cache.clone();
            async move { cache.get_tagged::<Vec<String>>(tag, "entries").await.unwrap() }
        };

        f.cache.set_tagged(tag, "entries", &stale).await.unwrap();
        let created = f.service.create(input("Barn"), Some(&f.admin)).await.unwrap();
        assert!(cached(&f).await.is_none());

        f.cache.set_tagged(tag, "entries", &stale).await.unwrap();
        let change = UpdatePropertyInput {
            price: Some(1),
            ..Default::default()
        };
        f.service.update(created.id, change, Some(&f.admin)).await.unwrap();
        assert!(cached(&f).await.is_none());

        f.cache.set_tagged(tag, "entries", &stale).await.unwrap();
        f.service.delete(created.id, Some(&f.admin)).await.unwrap();
        assert!(cached(&f).await.is_none());
    }
}
