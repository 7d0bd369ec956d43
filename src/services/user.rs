//! User service
//!
//! Registration (the first user becomes admin), login/logout, session
//! validation and access-checked user management.

use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{authorize, ContentError};
use crate::access::{Collection, Operation};
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Shortest accepted password
const MIN_PASSWORD_LENGTH: usize = 8;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// The operation needs a logged-in user
    #[error("Authentication required")]
    Unauthorized,

    /// Access denied
    #[error("{0}")]
    Forbidden(String),

    /// User not found or not visible to the requester
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ContentError> for UserServiceError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Unauthorized => UserServiceError::Unauthorized,
            ContentError::Forbidden { .. } => UserServiceError::Forbidden(err.to_string()),
            ContentError::NotFound(_) => UserServiceError::NotFound,
            ContentError::ValidationError(msg) => UserServiceError::ValidationError(msg),
            ContentError::Conflict(msg) => UserServiceError::UserExists(msg),
            ContentError::InternalError(e) => UserServiceError::InternalError(e),
        }
    }
}

/// Input for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
    /// Only honoured when an admin creates the account
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl RegisterInput {
    pub fn new(email: impl Into<String>, name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            password: password.into(),
            role: None,
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for updating a user; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    /// Only admins may change roles
    pub role: Option<UserRole>,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Register a new user.
    ///
    /// The first user ever stored is an admin regardless of the requested
    /// role. Afterwards a requested role is honoured only when `requester` is
    /// an admin; everyone else gets the default role.
    pub async fn register(
        &self,
        input: RegisterInput,
        requester: Option<&User>,
    ) -> Result<User, UserServiceError> {
        authorize(Collection::Users, Operation::Create, requester)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        let email = input.email.trim().to_lowercase();
        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let role = match (input.role, requester) {
            (Some(role), Some(admin)) if admin.is_admin() => role,
            (Some(role), _) if role != UserRole::default() => {
                tracing::debug!(%role, "Ignoring role requested by non-admin");
                UserRole::default()
            }
            _ => UserRole::default(),
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(email, input.name.trim().to_string(), password_hash, role);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        if created.role == UserRole::Admin && role != UserRole::Admin {
            tracing::info!(user_id = created.id, "First user promoted to admin");
        }

        Ok(created)
    }

    /// Login with email and password, returning a new session
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let email = input.email.trim().to_lowercase();
        let user = self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        let password_valid =
            verify_password(&input.password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(invalid());
        }

        self.create_session(user.id).await
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown and expired tokens yield `None`; expired sessions are removed.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Get a user visible to the requester
    pub async fn get(&self, id: i64, requester: Option<&User>) -> Result<User, UserServiceError> {
        let filter = authorize(Collection::Users, Operation::Read, requester)?;
        self.user_repo
            .find(id, &filter)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)
    }

    /// List users visible to the requester
    pub async fn list(
        &self,
        requester: Option<&User>,
        params: &ListParams,
    ) -> Result<PagedResult<User>, UserServiceError> {
        let filter = authorize(Collection::Users, Operation::Read, requester)?;
        let (docs, total) = self
            .user_repo
            .list(&filter, params)
            .await
            .context("Failed to list users")?;
        Ok(PagedResult::new(docs, total, params))
    }

    /// Update a user the requester may edit
    pub async fn update(
        &self,
        id: i64,
        input: UpdateUserInput,
        requester: Option<&User>,
    ) -> Result<User, UserServiceError> {
        let filter = authorize(Collection::Users, Operation::Update, requester)?;
        let mut user = self
            .user_repo
            .find(id, &filter)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)?;

        if let Some(email) = input.email {
            validate_email(&email)?;
            let email = email.trim().to_lowercase();
            if let Some(existing) = self
                .user_repo
                .get_by_email(&email)
                .await
                .context("Failed to check email")?
            {
                if existing.id != user.id {
                    return Err(UserServiceError::UserExists(format!(
                        "Email '{}' is already registered",
                        email
                    )));
                }
            }
            user.email = email;
        }

        if let Some(name) = input.name {
            user.name = name.trim().to_string();
        }

        if let Some(password) = input.password {
            validate_password(&password)?;
            user.password_hash = hash_password(&password).context("Failed to hash password")?;
        }

        if let Some(role) = input.role {
            if role != user.role {
                if !requester.is_some_and(User::is_admin) {
                    return Err(UserServiceError::Forbidden(
                        "Only admins can change roles".to_string(),
                    ));
                }
                user.role = role;
            }
        }

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;
        Ok(updated)
    }

    /// Delete a user (admins only)
    pub async fn delete(&self, id: i64, requester: Option<&User>) -> Result<(), UserServiceError> {
        let filter = authorize(Collection::Users, Operation::Delete, requester)?;
        let deleted = self
            .user_repo
            .delete(id, &filter)
            .await
            .context("Failed to delete user")?;

        if deleted {
            Ok(())
        } else {
            Err(UserServiceError::NotFound)
        }
    }

    /// Get user by email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(&email.trim().to_lowercase())
            .await
            .context("Failed to get user by email")?;
        Ok(user)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(UserServiceError::ValidationError("Email cannot be empty".to_string()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(UserServiceError::ValidationError("Invalid email format".to_string())),
    }
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    fn input(email: &str) -> RegisterInput {
        RegisterInput::new(email, "Test", "password123")
    }

    #[tokio::test]
    async fn test_first_user_is_admin_second_is_not() {
        let service = setup_test_service().await;

        let first = service.register(input("first@example.com"), None).await.unwrap();
        let second = service.register(input("second@example.com"), None).await.unwrap();

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_role_request_needs_admin() {
        let service = setup_test_service().await;
        let admin = service.register(input("admin@example.com"), None).await.unwrap();
        let member = service.register(input("member@example.com"), None).await.unwrap();

        let mut self_promoted = input("sneaky@example.com");
        self_promoted.role = Some(UserRole::Admin);
        let created = service.register(self_promoted, Some(&member)).await.unwrap();
        assert_eq!(created.role, UserRole::User);

        let mut agent = input("agent@example.com");
        agent.role = Some(UserRole::Agent);
        let created = service.register(agent, Some(&admin)).await.unwrap();
        assert_eq!(created.role, UserRole::Agent);
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let service = setup_test_service().await;

        let bad_email = service.register(input("not-an-email"), None).await;
        assert!(matches!(bad_email, Err(UserServiceError::ValidationError(_))));

        let short = service
            .register(RegisterInput::new("a@example.com", "A", "short"), None)
            .await;
        assert!(matches!(short, Err(UserServiceError::ValidationError(_))));

        service.register(input("dup@example.com"), None).await.unwrap();
        let dup = service.register(input("DUP@example.com"), None).await;
        assert!(matches!(dup, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let service = setup_test_service().await;
        let user = service.register(input("login@example.com"), None).await.unwrap();

        let session = service
            .login(LoginInput {
                email: "login@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.user_id, user.id);

        let resolved = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = setup_test_service().await;
        service.register(input("login@example.com"), None).await.unwrap();

        let result = service
            .login(LoginInput {
                email: "login@example.com".into(),
                password: "wrong-password".into(),
            })
            .await;
        assert!(matches!(result, Err(UserServiceError::AuthenticationError(_))));

        let unknown = service
            .login(LoginInput {
                email: "nobody@example.com".into(),
                password: "password123".into(),
            })
            .await;
        assert!(matches!(unknown, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_members_only_see_themselves() {
        let service = setup_test_service().await;
        let admin = service.register(input("admin@example.com"), None).await.unwrap();
        let member = service.register(input("member@example.com"), None).await.unwrap();

        assert!(matches!(
            service.get(admin.id, Some(&member)).await,
            Err(UserServiceError::NotFound)
        ));
        assert_eq!(service.get(member.id, Some(&member)).await.unwrap().id, member.id);
        assert!(matches!(service.get(member.id, None).await, Err(UserServiceError::Unauthorized)));

        let page = service.list(Some(&admin), &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        let page = service.list(Some(&member), &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_update_role_requires_admin() {
        let service = setup_test_service().await;
        let admin = service.register(input("admin@example.com"), None).await.unwrap();
        let member = service.register(input("member@example.com"), None).await.unwrap();

        let promote = UpdateUserInput {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(matches!(
            service.update(member.id, promote.clone(), Some(&member)).await,
            Err(UserServiceError::Forbidden(_))
        ));

        let promoted = service.update(member.id, promote, Some(&admin)).await.unwrap();
        assert_eq!(promoted.role, UserRole::Admin);

        let renamed = service
            .update(
                member.id,
                UpdateUserInput {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
                Some(&member),
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_admin_only() {
        let service = setup_test_service().await;
        let admin = service.register(input("admin@example.com"), None).await.unwrap();
        let member = service.register(input("member@example.com"), None).await.unwrap();

        assert!(matches!(
            service.delete(member.id, Some(&member)).await,
            Err(UserServiceError::Forbidden(_))
        ));
        service.delete(member.id, Some(&admin)).await.unwrap();
        assert!(matches!(
            service.delete(member.id, Some(&admin)).await,
            Err(UserServiceError::NotFound)
        ));
    }
}
