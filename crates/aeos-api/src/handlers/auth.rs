//! Authentication endpoints.
//!
//! Credentials never touch local storage; every flow passes through the
//! identity provider and returns its token set verbatim.

use aeos_auth::{BearerIdentity, GrantRequest, Identity, NewProviderUser, TokenSet};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::error::ApiError;
use crate::schemas::{
    LoginRequest, RefreshRequest, SignupRequest, SignupResponse, SocialCallbackRequest,
};
use crate::state::AppState;

/// `POST /auth/login` - password grant.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenSet>, ApiError> {
    body.validate()?;

    let tokens = state
        .management
        .exchange(GrantRequest::Password {
            username: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(tokens))
}

/// `POST /auth/signup` - provision a provider user.
///
/// Returns the sanitized provider profile; the client logs in separately.
/// A retried signup is safe: the provider reports a taken email as 409,
/// which maps straight to a conflict here.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    body.validate()?;

    let mut profile = NewProviderUser::new(&body.email, &body.password);
    if let Some(name) = &body.name {
        profile = profile.with_name(name);
    }
    let created = state.management.create_user(&profile).await?;
    tracing::info!(subject = %created.user_id, "Signed up new user");

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// `POST /auth/refresh` - refresh-token grant.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenSet>, ApiError> {
    body.validate()?;

    let tokens = state
        .management
        .exchange(GrantRequest::RefreshToken {
            refresh_token: body.refresh_token,
        })
        .await?;

    Ok(Json(tokens))
}

/// `POST /auth/social-callback` - authorization-code grant.
pub async fn social_callback(
    State(state): State<AppState>,
    Json(body): Json<SocialCallbackRequest>,
) -> Result<Json<TokenSet>, ApiError> {
    body.validate()?;

    let tokens = state
        .management
        .exchange(GrantRequest::AuthorizationCode {
            code: body.code,
            redirect_uri: body.redirect_uri,
        })
        .await?;

    Ok(Json(tokens))
}

/// `GET /auth/user` - the verified claims of the presented token.
pub async fn token_identity(BearerIdentity(identity): BearerIdentity) -> Json<Identity> {
    Json(identity)
}
