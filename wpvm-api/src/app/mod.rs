// Shared state and HTTP layers applied to every route
pub mod state;

pub use state::AppState;

use tower_http::cors::{Any, CorsLayer};

/// The provisioning frontend is served from another origin and posts
/// credentials as JSON or form bodies.
pub fn create_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
