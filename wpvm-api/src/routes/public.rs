// Public routes (no request body, no provider access)
use crate::app::AppState;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_docs;
use crate::version;

pub fn create_public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api_docs::ApiDoc::openapi()),
        )
        .route("/", get(root))
        .route("/health", get(health))
        .route("/version", get(get_version))
}

/// Get version information (public endpoint)
async fn get_version() -> axum::Json<version::VersionInfo> {
    axum::Json(version::get_version_info())
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn root() -> &'static str {
    "WordPress VM provisioning API"
}
