//! Sitemap and robots.txt routes
//!
//! - GET /categories-sitemap.xml, /faqs-sitemap.xml,
//!   /knowledge-base-sitemap.xml, /properties-sitemap.xml
//! - GET /sitemap.xml (index)
//! - GET /robots.txt

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::SitemapSection;

const XML_CONTENT_TYPE: &str = "application/xml";

pub fn router() -> Router<AppState> {
    let mut router = Router::new()
        .route("/sitemap.xml", get(sitemap_index))
        .route("/robots.txt", get(robots));

    for section in SitemapSection::ALL {
        router = router.route(
            &section.route(),
            get(section_sitemap).layer(Extension(section)),
        );
    }
    router
}

fn xml(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE))],
        body,
    )
        .into_response()
}

async fn section_sitemap(
    State(state): State<AppState>,
    Extension(section): Extension<SitemapSection>,
) -> Result<Response, ApiError> {
    let body = state.sitemap_service.render(section).await.map_err(|e| {
        tracing::error!("Failed to build {}: {:#}", section.tag(), e);
        ApiError::internal_error("Failed to build sitemap")
    })?;
    Ok(xml(body))
}

async fn sitemap_index(State(state): State<AppState>) -> Response {
    xml(state.sitemap_service.index())
}

async fn robots(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
        state.sitemap_service.robots(),
    )
        .into_response()
}
