//! Item CRUD endpoints.
//!
//! Every operation is scoped to the caller's subject. A record that exists
//! under someone else's subject produces the same 404 as one that never
//! existed.

use aeos_auth::BearerIdentity;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::ApiError;
use crate::schemas::{ItemCreate, ItemResponse, ItemUpdate, PageQuery};
use crate::state::AppState;

fn item_not_found() -> ApiError {
    ApiError::not_found("Item not found")
}

/// `GET /items` - list the caller's items.
pub async fn list(
    State(state): State<AppState>,
    BearerIdentity(identity): BearerIdentity,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = state
        .items
        .list(&identity.subject, page.into_params())
        .await?;

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// `POST /items` - create an item owned by the caller.
pub async fn create(
    State(state): State<AppState>,
    BearerIdentity(identity): BearerIdentity,
    Json(body): Json<ItemCreate>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    body.validate()?;

    let item = state.items.create(body.into_item(&identity.subject)).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// `GET /items/{id}` - fetch one of the caller's items.
pub async fn get(
    State(state): State<AppState>,
    BearerIdentity(identity): BearerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = state
        .items
        .get(id, &identity.subject)
        .await?
        .ok_or_else(item_not_found)?;

    Ok(Json(item.into()))
}

/// `PUT /items/{id}` - partially update one of the caller's items.
pub async fn update(
    State(state): State<AppState>,
    BearerIdentity(identity): BearerIdentity,
    Path(id): Path<Uuid>,
    Json(body): Json<ItemUpdate>,
) -> Result<Json<ItemResponse>, ApiError> {
    body.validate()?;

    let item = state
        .items
        .update(id, &identity.subject, body.into_patch())
        .await?
        .ok_or_else(item_not_found)?;

    Ok(Json(item.into()))
}

/// `DELETE /items/{id}` - permanently remove one of the caller's items.
pub async fn delete(
    State(state): State<AppState>,
    BearerIdentity(identity): BearerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = state.items.hard_delete(id, &identity.subject).await?;
    if !removed {
        return Err(item_not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}
