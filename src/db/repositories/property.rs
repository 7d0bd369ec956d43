//! Property repository
//!
//! Database operations for listings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::query::{self, Table};
use crate::access::Where;
use crate::db::{Backend, DynDatabasePool};
use crate::models::{ListParams, Property, SitemapRecord};

const PROPERTIES: Table = Table {
    name: "properties",
    columns: "id, title, slug, description, price, address, city, bedrooms, bathrooms, area, \
              property_type_id, owner_id, status, is_draft, created_at, updated_at",
    order_by: "created_at DESC, id DESC",
};

/// Property repository trait
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Insert a listing; `id` and timestamps on the input are ignored
    async fn create(&self, property: &Property) -> Result<Property>;

    /// Get a listing by ID if it matches the access filter
    async fn find(&self, id: i64, filter: &Where) -> Result<Option<Property>>;

    /// List listings matching the access filter
    async fn list(&self, filter: &Where, params: &ListParams) -> Result<(Vec<Property>, i64)>;

    /// Persist every editable column and stamp `updated_at`
    async fn update(&self, property: &Property) -> Result<Property>;

    /// Delete a listing if it matches the access filter
    async fn delete(&self, id: i64, filter: &Where) -> Result<bool>;

    /// Check whether a slug is taken, optionally ignoring one listing
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Slug and modification time of listings matching `filter`
    async fn sitemap_records(&self, filter: &Where) -> Result<Vec<SitemapRecord>>;
}

/// SQLx-based property repository implementation
pub struct SqlxPropertyRepository {
    pool: DynDatabasePool,
}

impl SqlxPropertyRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PropertyRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PropertyRepository for SqlxPropertyRepository {
    async fn create(&self, p: &Property) -> Result<Property> {
        const SQL: &str = r#"
            INSERT INTO properties (title, slug, description, price, address, city, bedrooms, bathrooms,
                area, property_type_id, owner_id, status, is_draft, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();
        let status = p.status.to_string();

        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SQL)
                .bind(&p.title)
                .bind(&p.slug)
                .bind(&p.description)
                .bind(p.price)
                .bind(&p.address)
                .bind(&p.city)
                .bind(p.bedrooms)
                .bind(p.bathrooms)
                .bind(p.area)
                .bind(p.property_type_id)
                .bind(p.owner_id)
                .bind(&status)
                .bind(p.is_draft)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create property")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(SQL)
                .bind(&p.title)
                .bind(&p.slug)
                .bind(&p.description)
                .bind(p.price)
                .bind(&p.address)
                .bind(&p.city)
                .bind(p.bedrooms)
                .bind(p.bathrooms)
                .bind(p.area)
                .bind(p.property_type_id)
                .bind(p.owner_id)
                .bind(&status)
                .bind(p.is_draft)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create property")?
                .last_insert_id() as i64,
        };

        self.find(id, &Where::all())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Property not found after insert"))
    }

    async fn find(&self, id: i64, filter: &Where) -> Result<Option<Property>> {
        query::find_by_id(&self.pool, PROPERTIES, id, filter).await
    }

    async fn list(&self, filter: &Where, params: &ListParams) -> Result<(Vec<Property>, i64)> {
        query::find_page(&self.pool, PROPERTIES, filter, params).await
    }

    async fn update(&self, p: &Property) -> Result<Property> {
        const SQL: &str = r#"
            UPDATE properties
            SET title = ?, slug = ?, description = ?, price = ?, address = ?, city = ?, bedrooms = ?,
                bathrooms = ?, area = ?, property_type_id = ?, status = ?, is_draft = ?, updated_at = ?
            WHERE id = ?
        "#;
        let now = Utc::now();
        let status = p.status.to_string();

        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SQL)
                .bind(&p.title)
                .bind(&p.slug)
                .bind(&p.description)
                .bind(p.price)
                .bind(&p.address)
                .bind(&p.city)
                .bind(p.bedrooms)
                .bind(p.bathrooms)
                .bind(p.area)
                .bind(p.property_type_id)
                .bind(&status)
                .bind(p.is_draft)
                .bind(now)
                .bind(p.id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(SQL)
                .bind(&p.title)
                .bind(&p.slug)
                .bind(&p.description)
                .bind(p.price)
                .bind(&p.address)
                .bind(&p.city)
                .bind(p.bedrooms)
                .bind(p.bathrooms)
                .bind(p.area)
                .bind(p.property_type_id)
                .bind(&status)
                .bind(p.is_draft)
                .bind(now)
                .bind(p.id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update property")?;

        self.find(p.id, &Where::all())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Property not found after update"))
    }

    async fn delete(&self, id: i64, filter: &Where) -> Result<bool> {
        let filter = Where::equals("id", id).and(filter.clone());
        Ok(query::delete_where(&self.pool, PROPERTIES.name, &filter).await? > 0)
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let found: Option<Property> =
            query::find_one(&self.pool, PROPERTIES, &Where::equals("slug", slug)).await?;
        Ok(found.is_some_and(|p| Some(p.id) != exclude_id))
    }

    async fn sitemap_records(&self, filter: &Where) -> Result<Vec<SitemapRecord>> {
        query::sitemap_records(&self.pool, PROPERTIES.name, filter).await
    }
}
