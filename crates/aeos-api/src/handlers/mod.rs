//! Request handlers, grouped by resource.
//!
//! Handlers stay thin: validate the body, call the provider client or the
//! repository, map absence to 404. Ownership is enforced by passing the
//! verified subject into every repository call.

pub mod auth;
pub mod items;
pub mod users;
