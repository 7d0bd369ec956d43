//! Admin and operational endpoints
//!
//! - POST /api/revalidate/{tag} - Drop cached entries under a tag (admin)
//! - POST /api/admin/seed - Seed reference data (admin)
//! - GET /api/health - Liveness and database check

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::config::DatabaseDriver;
use crate::services::{seed_property_types, SeedReport};

/// Response of a tag revalidation
#[derive(Debug, Serialize, Deserialize)]
pub struct RevalidateResponse {
    pub tag: String,
    pub removed: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: DatabaseDriver,
}

/// Admin-only routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/revalidate/{tag}", post(revalidate))
        .route("/admin/seed", post(seed))
}

pub fn health_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Tags are plain names; glob characters would widen the invalidation
fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// POST /api/revalidate/{tag}
async fn revalidate(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<RevalidateResponse>, ApiError> {
    if !is_valid_tag(&tag) {
        return Err(ApiError::validation_error(format!("Invalid tag: {}", tag)));
    }

    let removed = state.cache.revalidate_tag(&tag).await.map_err(|e| {
        tracing::error!("Failed to revalidate {}: {:#}", tag, e);
        ApiError::internal_error("Failed to revalidate tag")
    })?;

    tracing::info!(%tag, removed, "Revalidated tag on request");
    Ok(Json(RevalidateResponse { tag, removed }))
}

/// POST /api/admin/seed
async fn seed(State(state): State<AppState>) -> Json<SeedReport> {
    Json(seed_property_types(&state.property_type_service).await)
}

/// GET /api/health
async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = state.pool.driver();
    match state.pool.ping().await {
        Ok(()) => Ok(Json(HealthResponse {
            status: "ok".to_string(),
            database,
        })),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".to_string(),
                    database,
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_tag() {
        assert!(is_valid_tag("properties-sitemap"));
        assert!(!is_valid_tag(""));
        assert!(!is_valid_tag("*"));
        assert!(!is_valid_tag("faqs-sitemap?x"));
    }
}
