//! Verification request API endpoints
//!
//! - GET|POST /api/verification-requests
//! - GET|PATCH|DELETE /api/verification-requests/{id}
//!
//! Errors use a flat `{"error": "..."}` body. Unexpected failures are logged
//! and answered with 500.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{PaginationQuery, SuccessResponse};
use crate::api::middleware::{AppState, MaybeUser};
use crate::models::{
    CreateVerificationInput, PagedResult, UpdateVerificationInput, VerificationRequest,
};
use crate::services::ContentError;

/// Error body of the verification endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationErrorBody {
    pub error: String,
}

/// Error response of the verification endpoints
#[derive(Debug)]
pub struct VerificationError {
    status: StatusCode,
    message: String,
}

impl VerificationError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<ContentError> for VerificationError {
    fn from(err: ContentError) -> Self {
        let status = match &err {
            ContentError::Unauthorized => StatusCode::UNAUTHORIZED,
            ContentError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ContentError::NotFound(_) => StatusCode::NOT_FOUND,
            ContentError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ContentError::Conflict(_) => StatusCode::CONFLICT,
            ContentError::InternalError(e) => {
                tracing::error!("Verification request failed: {:#}", e);
                return Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process verification request",
                );
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<PathRejection> for VerificationError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<JsonRejection> for VerificationError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for VerificationError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(VerificationErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route(
            "/{id}",
            get(get_request).patch(update_request).delete(delete_request),
        )
}

/// GET /api/verification-requests
async fn list_requests(
    State(state): State<AppState>,
    requester: MaybeUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<VerificationRequest>>, VerificationError> {
    Ok(Json(
        state
            .verification_service
            .list(requester.as_ref(), &query.into())
            .await?,
    ))
}

/// POST /api/verification-requests
async fn create_request(
    State(state): State<AppState>,
    requester: MaybeUser,
    body: Result<Json<CreateVerificationInput>, JsonRejection>,
) -> Result<(StatusCode, Json<VerificationRequest>), VerificationError> {
    let Json(input) = body?;
    let request = state
        .verification_service
        .create(input, requester.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/verification-requests/{id}
async fn get_request(
    State(state): State<AppState>,
    requester: MaybeUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<VerificationRequest>, VerificationError> {
    let Path(id) = id?;
    Ok(Json(
        state
            .verification_service
            .get(id, requester.as_ref())
            .await?,
    ))
}

/// PATCH /api/verification-requests/{id}
async fn update_request(
    State(state): State<AppState>,
    requester: MaybeUser,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateVerificationInput>, JsonRejection>,
) -> Result<Json<VerificationRequest>, VerificationError> {
    let Path(id) = id?;
    let Json(input) = body?;
    Ok(Json(
        state
            .verification_service
            .update(id, input, requester.as_ref())
            .await?,
    ))
}

/// DELETE /api/verification-requests/{id}
async fn delete_request(
    State(state): State<AppState>,
    requester: MaybeUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse>, VerificationError> {
    let Path(id) = id?;
    state
        .verification_service
        .delete(id, requester.as_ref())
        .await?;
    Ok(Json(SuccessResponse::ok()))
}
