//! HTTP front end for a passweb vault.
//!
//! Exposes setup, login and entry access as JSON endpoints under `/api/v1`.
//! Authenticated routes expect the session token in the `X-Session-ID`
//! header.

pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use passweb_vault::Vault;

pub use error::ApiError;
pub use handlers::SESSION_HEADER;

/// Shared state of all handlers.
#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<Vault>,
}

impl AppState {
    pub fn new(vault: Arc<Vault>) -> Self {
        Self { vault }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/setup", post(handlers::setup))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/entries", post(handlers::create_entry))
        .route("/entries/list", post(handlers::list_entries));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
