//! Verification request repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::query::{self, Table};
use crate::access::Where;
use crate::db::{Backend, DynDatabasePool};
use crate::models::{ListParams, VerificationRequest};

const VERIFICATION_REQUESTS: Table = Table {
    name: "verification_requests",
    columns: "id, user_id, document_id, notes, status, reviewed_at, reviewed_by, created_at, updated_at",
    order_by: "created_at DESC, id DESC",
};

/// Verification request repository trait
#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// File a new pending request
    async fn create(
        &self,
        user_id: i64,
        document_id: Option<i64>,
        notes: Option<&str>,
    ) -> Result<VerificationRequest>;

    async fn find(&self, id: i64, filter: &Where) -> Result<Option<VerificationRequest>>;

    async fn list(
        &self,
        filter: &Where,
        params: &ListParams,
    ) -> Result<(Vec<VerificationRequest>, i64)>;

    /// Persist status, review stamp, notes and document
    async fn update(&self, request: &VerificationRequest) -> Result<VerificationRequest>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based verification request repository implementation
pub struct SqlxVerificationRepository {
    pool: DynDatabasePool,
}

impl SqlxVerificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VerificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VerificationRepository for SqlxVerificationRepository {
    async fn create(
        &self,
        user_id: i64,
        document_id: Option<i64>,
        notes: Option<&str>,
    ) -> Result<VerificationRequest> {
        const SQL: &str = r#"
            INSERT INTO verification_requests (user_id, document_id, notes, status, created_at, updated_at)
            VALUES (?, ?, ?, 'pending', ?, ?)
        "#;
        let now = Utc::now();

        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SQL)
                .bind(user_id)
                .bind(document_id)
                .bind(notes)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create verification request")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(SQL)
                .bind(user_id)
                .bind(document_id)
                .bind(notes)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create verification request")?
                .last_insert_id() as i64,
        };

        self.find(id, &Where::all())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Verification request not found after insert"))
    }

    async fn find(&self, id: i64, filter: &Where) -> Result<Option<VerificationRequest>> {
        query::find_by_id(&self.pool, VERIFICATION_REQUESTS, id, filter).await
    }

    async fn list(
        &self,
        filter: &Where,
        params: &ListParams,
    ) -> Result<(Vec<VerificationRequest>, i64)> {
        query::find_page(&self.pool, VERIFICATION_REQUESTS, filter, params).await
    }

    async fn update(&self, request: &VerificationRequest) -> Result<VerificationRequest> {
        const SQL: &str = r#"
            UPDATE verification_requests
            SET document_id = ?, notes = ?, status = ?, reviewed_at = ?, reviewed_by = ?, updated_at = ?
            WHERE id = ?
        "#;
        let status = request.status.to_string();

        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SQL)
                .bind(request.document_id)
                .bind(&request.notes)
                .bind(&status)
                .bind(request.reviewed_at)
                .bind(request.reviewed_by)
                .bind(request.updated_at)
                .bind(request.id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(SQL)
                .bind(request.document_id)
                .bind(&request.notes)
                .bind(&status)
                .bind(request.reviewed_at)
                .bind(request.reviewed_by)
                .bind(request.updated_at)
                .bind(request.id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update verification request")?;

        self.find(request.id, &Where::all())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Verification request not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let filter = Where::equals("id", id);
        Ok(query::delete_where(&self.pool, VERIFICATION_REQUESTS.name, &filter).await? > 0)
    }
}
