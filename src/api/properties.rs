//! Property listing and property type API endpoints
//!
//! - GET|POST /api/properties, GET|PATCH|DELETE /api/properties/{id}
//! - GET|POST /api/property-types, GET|PATCH|DELETE /api/property-types/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{
    CreatePropertyInput, CreatePropertyTypeInput, PagedResult, Property, PropertyType,
    UpdatePropertyInput, UpdatePropertyTypeInput,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_properties).post(create_property))
        .route(
            "/{id}",
            get(get_property).patch(update_property).delete(delete_property),
        )
}

pub fn types_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_property_types).post(create_property_type))
        .route(
            "/{id}",
            get(get_property_type)
                .patch(update_property_type)
                .delete(delete_property_type),
        )
}

async fn list_properties(
    State(state): State<AppState>,
    requester: MaybeUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<Property>>, ApiError> {
    Ok(Json(
        state
            .property_service
            .list(requester.as_ref(), &query.into())
            .await?,
    ))
}

async fn create_property(
    State(state): State<AppState>,
    requester: MaybeUser,
    Json(body): Json<CreatePropertyInput>,
) -> Result<(StatusCode, Json<Property>), ApiError> {
    let property = state
        .property_service
        .create(body, requester.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(property)))
}

async fn get_property(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Property>, ApiError> {
    Ok(Json(state.property_service.get(id, requester.as_ref()).await?))
}

async fn update_property(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePropertyInput>,
) -> Result<Json<Property>, ApiError> {
    Ok(Json(
        state
            .property_service
            .update(id, body, requester.as_ref())
            .await?,
    ))
}

async fn delete_property(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.property_service.delete(id, requester.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_property_types(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<PropertyType>>, ApiError> {
    Ok(Json(state.property_type_service.list(&query.into()).await?))
}

async fn create_property_type(
    State(state): State<AppState>,
    requester: MaybeUser,
    Json(body): Json<CreatePropertyTypeInput>,
) -> Result<(StatusCode, Json<PropertyType>), ApiError> {
    let created = state
        .property_type_service
        .create(body, requester.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_property_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PropertyType>, ApiError> {
    Ok(Json(state.property_type_service.get(id).await?))
}

async fn update_property_type(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePropertyTypeInput>,
) -> Result<Json<PropertyType>, ApiError> {
    Ok(Json(
        state
            .property_type_service
            .update(id, body, requester.as_ref())
            .await?,
    ))
}

async fn delete_property_type(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .property_type_service
        .delete(id, requester.as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
