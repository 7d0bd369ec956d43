//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::query::{self, Table};
use crate::access::Where;
use crate::db::{Backend, DynDatabasePool};
use crate::models::{ListParams, User};

const USERS: Table = Table {
    name: "users",
    columns: "id, email, name, password_hash, role, created_at, updated_at",
    order_by: "id",
};

/// Insert that grants `admin` when the table is still empty.
///
/// The emptiness check and the insert are one statement, so two concurrent
/// first sign-ups cannot both become admin.
const INSERT_USER: &str = r#"
    INSERT INTO users (email, name, password_hash, role, created_at, updated_at)
    SELECT ?, ?, ?, CASE WHEN EXISTS (SELECT 1 FROM users) THEN ? ELSE 'admin' END, ?, ?
"#;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user. The very first user is always stored as admin,
    /// whatever role was requested.
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get user by ID if it matches the access filter
    async fn find(&self, id: i64, filter: &Where) -> Result<Option<User>>;

    /// List users matching the access filter
    async fn list(&self, filter: &Where, params: &ListParams) -> Result<(Vec<User>, i64)>;

    /// Update a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user if it matches the access filter, returning whether a row was removed
    async fn delete(&self, id: i64, filter: &Where) -> Result<bool>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let role = user.role.to_string();

        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(INSERT_USER)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.password_hash)
                .bind(&role)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create user")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_USER)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.password_hash)
                .bind(&role)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create user")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        query::find_one(&self.pool, USERS, &Where::equals("id", id)).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        query::find_one(&self.pool, USERS, &Where::equals("email", email)).await
    }

    async fn find(&self, id: i64, filter: &Where) -> Result<Option<User>> {
        query::find_by_id(&self.pool, USERS, id, filter).await
    }

    async fn list(&self, filter: &Where, params: &ListParams) -> Result<(Vec<User>, i64)> {
        query::find_page(&self.pool, USERS, filter, params).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        const SQL: &str = r#"
            UPDATE users
            SET email = ?, name = ?, password_hash = ?, role = ?, updated_at = ?
            WHERE id = ?
        "#;
        let now = Utc::now();
        let role = user.role.to_string();

        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SQL)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.password_hash)
                .bind(&role)
                .bind(now)
                .bind(user.id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(SQL)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.password_hash)
                .bind(&role)
                .bind(now)
                .bind(user.id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update user")?;

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn delete(&self, id: i64, filter: &Where) -> Result<bool> {
        let filter = Where::equals("id", id).and(filter.clone());
        Ok(query::delete_where(&self.pool, USERS.name, &filter).await? > 0)
    }

    async fn count(&self) -> Result<i64> {
        query::count_where(&self.pool, USERS.name, &Where::all()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;
    use crate::services::password::hash_password;

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn create_test_user(email: &str, role: UserRole) -> User {
        User::new(
            email.to_string(),
            "Test".to_string(),
            hash_password("test_password").expect("Failed to hash password"),
            role,
        )
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let repo = setup_test_repo().await;

        let first = repo
            .create(&create_test_user("first@example.com", UserRole::User))
            .await
            .expect("Failed to create user");
        let second = repo
            .create(&create_test_user("second@example.com", UserRole::User))
            .await
            .expect("Failed to create user");

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::User);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_signups_yield_one_admin() {
        use crate::config::{DatabaseConfig, DatabaseDriver};

        let dir = tempfile::TempDir::new().unwrap();
        let config = DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: dir.path().join("race.db").display().to_string(),
        };
        let pool = crate::db::create_pool(&config).await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = Arc::new(SqlxUserRepository::new(pool));

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let user = User::new(
                    format!("racer{}@example.com", i),
                    "Racer".to_string(),
                    "hash".to_string(),
                    UserRole::User,
                );
                repo.create(&user).await
            }));
        }

        let mut admins = 0;
        for handle in handles {
            let user = handle.await.unwrap().expect("Failed to create user");
            if user.role == UserRole::Admin {
                admins += 1;
            }
        }
        assert_eq!(admins, 1);
        assert_eq!(repo.count().await.unwrap(), 16);
    }

    #[tokio::test]
    async fn test_requested_role_kept_after_first() {
        let repo = setup_test_repo().await;
        repo.create(&create_test_user("admin@example.com", UserRole::User))
            .await
            .unwrap();

        let agent = repo
            .create(&create_test_user("agent@example.com", UserRole::Agent))
            .await
            .unwrap();
        assert_eq!(agent.role, UserRole::Agent);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = setup_test_repo().await;
        repo.create(&create_test_user("dup@example.com", UserRole::User))
            .await
            .unwrap();

        let result = repo
            .create(&create_test_user("dup@example.com", UserRole::User))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_by_email_and_not_found() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&create_test_user("find@example.com", UserRole::User))
            .await
            .unwrap();

        let found = repo.get_by_email("find@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_respects_filter() {
        let repo = setup_test_repo().await;
        let a = repo
            .create(&create_test_user("a@example.com", UserRole::User))
            .await
            .unwrap();
        let b = repo
            .create(&create_test_user("b@example.com", UserRole::User))
            .await
            .unwrap();

        let own = Where::equals("id", a.id);
        assert!(repo.find(a.id, &own).await.unwrap().is_some());
        assert!(repo.find(b.id, &own).await.unwrap().is_none());

        let (docs, total) = repo.list(&own, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(docs[0].id, a.id);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let mut user = repo
            .create(&create_test_user("upd@example.com", UserRole::User))
            .await
            .unwrap();

        user.name = "Renamed".to_string();
        let updated = repo.update(&user).await.unwrap();
        assert_eq!(updated.name, "Renamed");

        assert!(!repo.delete(user.id, &Where::equals("id", user.id + 1)).await.unwrap());
        assert!(repo.delete(user.id, &Where::all()).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
