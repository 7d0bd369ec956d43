//! User and authentication API endpoints
//!
//! - POST /api/users - Register (or, for admins, create) a user
//! - POST /api/users/login - Log in
//! - POST /api/users/logout - Log out
//! - GET /api/users/me - Current user
//! - GET /api/users, GET|PATCH|DELETE /api/users/{id}

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{PagedResult, Session, User};
use crate::services::{LoginInput, RegisterInput, UpdateUserInput};

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
        .route("/{id}", get(get_user).patch(update_user).delete(delete_user))
}

fn session_cookie(session: &Session) -> Result<HeaderValue, ApiError> {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id, max_age
    );
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::internal_error(e.to_string()))
}

/// POST /api/users
///
/// An anonymous registration also logs the new user in.
async fn register(
    State(state): State<AppState>,
    requester: MaybeUser,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state.user_service.register(body, requester.as_ref()).await?;

    let mut headers = HeaderMap::new();
    let mut token = None;
    if requester.0.is_none() {
        let session = state
            .user_service
            .login(LoginInput {
                email: user.email.clone(),
                password,
            })
            .await?;
        headers.insert(header::SET_COOKIE, session_cookie(&session)?);
        token = Some(session.id);
    }

    Ok((StatusCode::CREATED, headers, Json(AuthResponse { user, token })))
}

/// POST /api/users/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.user_service.login(body).await?;

    let user = state
        .user_service
        .validate_session(&session.id)
        .await?
        .ok_or_else(|| ApiError::internal_error("Session validation failed"))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&session)?);

    Ok((
        headers,
        Json(AuthResponse {
            user,
            token: Some(session.id),
        }),
    ))
}

/// POST /api/users/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/users/me
async fn get_current_user(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

/// GET /api/users
async fn list_users(
    State(state): State<AppState>,
    requester: MaybeUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    let page = state
        .user_service
        .list(requester.as_ref(), &query.into())
        .await?;
    Ok(Json(page))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.get(id, requester.as_ref()).await?))
}

/// PATCH /api/users/{id}
async fn update_user(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserInput>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        state.user_service.update(id, body, requester.as_ref()).await?,
    ))
}

/// DELETE /api/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete(id, requester.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}
