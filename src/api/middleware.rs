//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - The JSON error envelope
//! - Authentication (session token from `Authorization: Bearer` or the
//!   `session` cookie) and admin authorization

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::cache::SharedCache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxContentRepository, SqlxMediaRepository, SqlxPropertyRepository,
    SqlxPropertyTypeRepository, SqlxSessionRepository, SqlxUserRepository,
    SqlxVerificationRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    ContentError, ContentService, MediaService, PropertyService, PropertyTypeService,
    SitemapService, UserService, UserServiceError, VerificationService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub cache: SharedCache,
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub media_service: Arc<MediaService>,
    pub property_service: Arc<PropertyService>,
    pub property_type_service: Arc<PropertyTypeService>,
    pub content_service: Arc<ContentService>,
    pub verification_service: Arc<VerificationService>,
    pub sitemap_service: Arc<SitemapService>,
}

impl AppState {
    /// Wire repositories and services over a migrated pool
    pub fn new(pool: DynDatabasePool, cache: SharedCache, config: Config) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let property_repo = SqlxPropertyRepository::boxed(pool.clone());
        let content_repo = SqlxContentRepository::boxed(pool.clone());

        let user_service = Arc::new(UserService::new(user_repo, session_repo));
        let media_repo = SqlxMediaRepository::boxed(pool.clone());
        let media_service = Arc::new(MediaService::new(
            media_repo.clone(),
            config.upload.clone(),
        ));
        let property_type_repo = SqlxPropertyTypeRepository::boxed(pool.clone());
        let property_service = Arc::new(PropertyService::new(
            property_repo.clone(),
            property_type_repo.clone(),
            cache.clone(),
        ));
        let property_type_service = Arc::new(PropertyTypeService::new(property_type_repo));
        let content_service = Arc::new(ContentService::new(content_repo.clone(), cache.clone()));
        let verification_service = Arc::new(VerificationService::new(
            SqlxVerificationRepository::boxed(pool.clone()),
            media_repo,
        ));
        let sitemap_service = Arc::new(SitemapService::new(
            property_repo,
            content_repo,
            cache.clone(),
            config.site.clone(),
        ));

        Self {
            pool,
            cache,
            config: Arc::new(config),
            user_service,
            media_service,
            property_service,
            property_type_service,
            content_service,
            verification_service,
            sitemap_service,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// The requesting user when one was resolved by [`optional_auth`]
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn as_ref(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|u| u.0.clone()),
        ))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Unauthorized => ApiError::unauthorized(err.to_string()),
            ContentError::Forbidden { .. } => ApiError::forbidden(err.to_string()),
            ContentError::NotFound(_) => ApiError::not_found(err.to_string()),
            ContentError::ValidationError(msg) => ApiError::validation_error(msg),
            ContentError::Conflict(msg) => ApiError::conflict(msg),
            ContentError::InternalError(e) => {
                tracing::error!("Request failed: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::Unauthorized => ApiError::unauthorized(err.to_string()),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::NotFound => ApiError::not_found(err.to_string()),
            UserServiceError::InternalError(e) => {
                tracing::error!("Request failed: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Extract the session token from the `Authorization` header or the
/// `session` cookie
pub fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("session=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        let token = extract_session_token(request.headers())
            .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

        let user = state
            .user_service
            .validate_session(&token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

        request.extensions_mut().insert(AuthenticatedUser(user));
    }
    Ok(next.run(request).await)
}

/// Optional authentication middleware
///
/// Resolves the user when a valid token is present; otherwise the request
/// continues anonymously.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }
    next.run(request).await
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}
