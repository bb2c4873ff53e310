//! HTTP surface of the AEOS API.
//!
//! # Overview
//!
//! Thin handlers over two collaborators: the identity provider (via
//! `aeos-auth`) for everything credential-shaped, and the ownership-scoped
//! repositories (via `aeos-storage`) for data. The layering rule is strict:
//! handlers validate input and translate absence into 404; they never
//! implement token or ownership logic themselves.
//!
//! Routes live under `/api/v1`:
//!
//! - `POST /auth/{login,signup,refresh,social-callback}`, `GET /auth/user`
//! - `GET|POST /items`, `GET|PUT|DELETE /items/{id}`
//! - `GET|PUT /users/me`, `GET /users/{id}`

pub mod error;
pub mod handlers;
pub mod router;
pub mod schemas;
pub mod state;

pub use error::{ApiError, FieldErrors};
pub use router::router;
pub use state::AppState;
