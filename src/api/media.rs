//! Media API endpoints
//!
//! - POST /api/media - Upload a file (multipart: `file`, optional `alt` and
//!   `is_public` fields)
//! - GET /api/media, GET|PATCH|DELETE /api/media/{id}
//! - GET /uploads/{filename} - Stored file contents

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    handler::Handler,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{Media, PagedResult, UpdateMediaInput};
use crate::services::UploadedFile;

/// Multipart overhead allowed on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Media routes. The upload body limit follows the configured file size.
pub fn router(max_file_size: u64) -> Router<AppState> {
    let limit = usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route(
            "/",
            get(list_media).post(upload_media.layer(DefaultBodyLimit::max(limit))),
        )
        .route("/{id}", get(get_media).patch(update_media).delete(delete_media))
}

/// Serves stored files at `/uploads/{filename}` under the media read access
pub fn files_router() -> Router<AppState> {
    Router::new().route("/uploads/{filename}", get(serve_file))
}

/// POST /api/media
async fn upload_media(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Media>), ApiError> {
    let mut file: Option<UploadedFile> = None;
    let mut alt = None;
    let mut is_public = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let original_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

                file = Some(UploadedFile {
                    original_name,
                    content_type,
                    data: data.to_vec(),
                    alt: None,
                    is_public: false,
                });
            }
            "alt" => {
                alt = Some(field.text().await.map_err(|e| {
                    ApiError::validation_error(format!("Failed to read alt text: {}", e))
                })?);
            }
            "is_public" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::validation_error(format!("Failed to read is_public: {}", e))
                })?;
                is_public = matches!(value.trim(), "true" | "1" | "on");
            }
            _ => {}
        }
    }

    let mut file = file.ok_or_else(|| ApiError::validation_error("No file provided"))?;
    file.alt = alt;
    file.is_public = is_public;

    let media = state.media_service.upload(file, Some(&user.0)).await?;
    Ok((StatusCode::CREATED, Json(media)))
}

/// GET /api/media
async fn list_media(
    State(state): State<AppState>,
    requester: MaybeUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<Media>>, ApiError> {
    Ok(Json(
        state
            .media_service
            .list(requester.as_ref(), &query.into())
            .await?,
    ))
}

/// GET /api/media/{id}
async fn get_media(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Media>, ApiError> {
    Ok(Json(state.media_service.get(id, requester.as_ref()).await?))
}

/// PATCH /api/media/{id}
async fn update_media(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateMediaInput>,
) -> Result<Json<Media>, ApiError> {
    Ok(Json(
        state
            .media_service
            .update(id, body, requester.as_ref())
            .await?,
    ))
}

/// DELETE /api/media/{id}
async fn delete_media(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.media_service.delete(id, requester.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Raster image types a browser renders without running scripts
const INLINE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

fn content_disposition(mime_type: &str) -> &'static str {
    if INLINE_TYPES.contains(&mime_type) {
        "inline"
    } else {
        "attachment"
    }
}

/// GET /uploads/{filename}
///
/// Uploads come from any member, so they are sandboxed and anything that
/// could carry markup (SVG, PDF) is sent as an attachment.
async fn serve_file(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let (media, data) = state
        .media_service
        .file(&filename, requester.as_ref())
        .await?;

    let content_type = HeaderValue::from_str(&media.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static(content_disposition(&media.mime_type)),
            ),
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (header::CONTENT_SECURITY_POLICY, HeaderValue::from_static("sandbox")),
        ],
        data,
    )
        .into_response())
}
