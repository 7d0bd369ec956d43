//! Property type repository
//!
//! Database operations for the property type reference data.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::query::{self, Table};
use crate::access::Where;
use crate::db::{Backend, DynDatabasePool};
use crate::models::{ListParams, PropertyType};

const PROPERTY_TYPES: Table = Table {
    name: "property_types",
    columns: "id, name, slug, description, created_at, updated_at",
    order_by: "name",
};

/// Property type repository trait
#[async_trait]
pub trait PropertyTypeRepository: Send + Sync {
    async fn create(&self, name: &str, slug: &str, description: Option<&str>) -> Result<PropertyType>;

    async fn get_by_id(&self, id: i64) -> Result<Option<PropertyType>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<PropertyType>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PropertyType>>;

    async fn list(&self, params: &ListParams) -> Result<(Vec<PropertyType>, i64)>;

    async fn update(&self, property_type: &PropertyType) -> Result<PropertyType>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based property type repository implementation
pub struct SqlxPropertyTypeRepository {
    pool: DynDatabasePool,
}

impl SqlxPropertyTypeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PropertyTypeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PropertyTypeRepository for SqlxPropertyTypeRepository {
    async fn create(&self, name: &str, slug: &str, description: Option<&str>) -> Result<PropertyType> {
        const SQL: &str = r#"
            INSERT INTO property_types (name, slug, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();

        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SQL)
                .bind(name)
                .bind(slug)
                .bind(description)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create property type")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(SQL)
                .bind(name)
                .bind(slug)
                .bind(description)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create property type")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Property type not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PropertyType>> {
        query::find_one(&self.pool, PROPERTY_TYPES, &Where::equals("id", id)).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<PropertyType>> {
        query::find_one(&self.pool, PROPERTY_TYPES, &Where::equals("name", name)).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PropertyType>> {
        query::find_one(&self.pool, PROPERTY_TYPES, &Where::equals("slug", slug)).await
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<PropertyType>, i64)> {
        query::find_page(&self.pool, PROPERTY_TYPES, &Where::all(), params).await
    }

    async fn update(&self, property_type: &PropertyType) -> Result<PropertyType> {
        const SQL: &str =
            "UPDATE property_types SET name = ?, slug = ?, description = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();

        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SQL)
                .bind(&property_type.name)
                .bind(&property_type.slug)
                .bind(&property_type.description)
                .bind(now)
                .bind(property_type.id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(SQL)
                .bind(&property_type.name)
                .bind(&property_type.slug)
                .bind(&property_type.description)
                .bind(now)
                .bind(property_type.id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update property type")?;

        self.get_by_id(property_type.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Property type not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(query::delete_where(&self.pool, PROPERTY_TYPES.name, &Where::equals("id", id)).await? > 0)
    }
}
