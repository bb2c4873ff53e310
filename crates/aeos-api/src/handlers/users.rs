//! User-profile endpoints.
//!
//! Profiles are provisioned lazily: the first `GET /users/me` after
//! authentication creates the local record from the token's claims.
//! Credentials stay at the provider; only profile fields live here.

use aeos_auth::{BearerIdentity, Identity};
use aeos_storage::UserRecord;
use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::error::ApiError;
use crate::schemas::{UserResponse, UserUpdate};
use crate::state::AppState;

/// Fetches the caller's profile, creating it on first sight.
async fn get_or_provision(state: &AppState, identity: &Identity) -> Result<UserRecord, ApiError> {
    if let Some(user) = state.users.find_by_owner(&identity.subject).await? {
        return Ok(user);
    }

    let mut record = UserRecord::new(&identity.subject);
    record.email = identity.email.clone();
    record.name = identity.name.clone();
    record.picture = identity.picture.clone();

    tracing::info!(subject = %identity.subject, "Provisioning user profile");
    Ok(state.users.create(record).await?)
}

/// `GET /users/me` - the caller's profile.
pub async fn me(
    State(state): State<AppState>,
    BearerIdentity(identity): BearerIdentity,
) -> Result<Json<UserResponse>, ApiError> {
    let user = get_or_provision(&state, &identity).await?;
    Ok(Json(user.into()))
}

/// `PUT /users/me` - partially update the caller's profile.
pub async fn update_me(
    State(state): State<AppState>,
    BearerIdentity(identity): BearerIdentity,
    Json(body): Json<UserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    body.validate()?;

    let user = get_or_provision(&state, &identity).await?;
    let updated = state
        .users
        .update(user.id, &identity.subject, body.into_patch())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(updated.into()))
}

/// `GET /users/{id}` - fetch a profile by id.
///
/// Scoped like every other read: only the caller's own profile is
/// visible, anything else is a 404.
pub async fn get(
    State(state): State<AppState>,
    BearerIdentity(identity): BearerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get(id, &identity.subject)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.into()))
}
