//! Shared application state.

use std::sync::Arc;

use aeos_auth::{AuthState, ManagementClient, TokenVerifier};
use aeos_storage::{Item, OwnedRepository, UserRecord};
use axum::extract::FromRef;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Bearer-token verification, shared with the extractor.
    pub auth: AuthState,

    /// Provider management and token-exchange client.
    pub management: Arc<ManagementClient>,

    /// Item repository.
    pub items: Arc<dyn OwnedRepository<Item>>,

    /// User-profile repository.
    pub users: Arc<dyn OwnedRepository<UserRecord>>,
}

impl AppState {
    /// Assembles application state from its components.
    #[must_use]
    pub fn new(
        verifier: Arc<TokenVerifier>,
        management: Arc<ManagementClient>,
        items: Arc<dyn OwnedRepository<Item>>,
        users: Arc<dyn OwnedRepository<UserRecord>>,
    ) -> Self {
        Self {
            auth: AuthState::new(verifier),
            management,
            items,
            users,
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
