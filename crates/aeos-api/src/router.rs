//! Route table.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers::{auth, items, users};
use crate::state::AppState;

/// Builds the versioned API router.
#[must_use]
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/social-callback", post(auth::social_callback))
        .route("/auth/user", get(auth::token_identity))
        .route("/items", get(items::list).post(items::create))
        .route(
            "/items/{id}",
            get(items::get).put(items::update).delete(items::delete),
        )
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/users/{id}", get(users::get));

    Router::new().nest("/api/v1", api).with_state(state)
}
