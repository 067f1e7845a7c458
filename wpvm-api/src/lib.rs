// Library entry point for tests and external usage

pub mod api_docs;
pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod provider_manager;
pub mod provisioning;
pub mod registry;
pub mod routes;
pub mod version;

// Re-export commonly used types
pub use app::AppState;

use axum::Router;
use std::sync::Arc;

/// Full application: routes, CORS and state.
pub fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router()
        .layer(app::create_cors())
        .with_state(state)
}
