//! Tether Server - in-memory REST resource server.
//!
//! Serves JSON resource collections under `/api/{resource}` and understands
//! the query encodings `tether-engine` produces by default, so a binding can
//! be exercised end to end against a real HTTP remote.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod store;

use crate::config::Config;
use crate::store::ResourceStore;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ResourceStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// State with an empty collection for every configured resource.
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(ResourceStore::new(config.resources.iter().cloned())),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
