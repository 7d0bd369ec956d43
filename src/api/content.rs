//! Editorial content API endpoints
//!
//! One router per kind, nested at `/api/categories`, `/api/faqs` and
//! `/api/knowledge-base`. The kind travels to the handlers as a request
//! extension.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{ContentEntry, ContentKind, CreateContentInput, PagedResult, UpdateContentInput};

/// Mount path of a kind below `/api`
pub fn mount_path(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Category => "/categories",
        ContentKind::Faq => "/faqs",
        ContentKind::KnowledgeBase => "/knowledge-base",
    }
}

pub fn router(kind: ContentKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/{id}", get(get_entry).patch(update_entry).delete(delete_entry))
        .layer(Extension(kind))
}

async fn list_entries(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    requester: MaybeUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<ContentEntry>>, ApiError> {
    Ok(Json(
        state
            .content_service
            .list(kind, requester.as_ref(), &query.into())
            .await?,
    ))
}

async fn create_entry(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    requester: MaybeUser,
    Json(body): Json<CreateContentInput>,
) -> Result<(StatusCode, Json<ContentEntry>), ApiError> {
    let entry = state
        .content_service
        .create(kind, body, requester.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn get_entry(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<ContentEntry>, ApiError> {
    Ok(Json(
        state
            .content_service
            .get(kind, id, requester.as_ref())
            .await?,
    ))
}

async fn update_entry(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    requester: MaybeUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateContentInput>,
) -> Result<Json<ContentEntry>, ApiError> {
    Ok(Json(
        state
            .content_service
            .update(kind, id, body, requester.as_ref())
            .await?,
    ))
}

async fn delete_entry(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .content_service
        .delete(kind, id, requester.as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
