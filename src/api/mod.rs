//! API layer - HTTP handlers and routing
//!
//! - Collection endpoints under `/api` (users, media, properties, property
//!   types, categories, FAQs, knowledge base, verification requests)
//! - Admin endpoints (tag revalidation, seeding)
//! - Sitemaps, sitemap index and robots.txt at the site root
//! - Stored upload files under `/uploads`

pub mod admin;
pub mod common;
pub mod content;
pub mod media;
pub mod middleware;
pub mod properties;
pub mod sitemap;
pub mod users;
pub mod verification;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::models::ContentKind;

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = admin::router()
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let mut router = Router::new()
        .nest("/users", users::router())
        .nest("/media", media::router(state.config.upload.max_file_size))
        .nest("/properties", properties::router())
        .nest("/property-types", properties::types_router())
        .nest("/verification-requests", verification::router());

    for kind in ContentKind::ALL {
        router = router.nest(content::mount_path(kind), content::router(kind));
    }

    router.merge(admin::health_router()).merge(admin_routes)
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", cors_origin, e);
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .merge(sitemap::router())
        .merge(media::files_router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
