// EC2 provisioning routes. Credentials travel in the request body; the
// service performs no authentication of its own.
use crate::app::AppState;
use crate::handlers::ec2;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;

pub fn create_ec2_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(ec2::create_vm))
        .route("/check-status", post(ec2::check_status))
        .route("/stop-instance", post(ec2::stop_instance))
}
