use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use wpvm_common::ProvisionError;

/// Per-field validation messages, e.g. `{"client_id": ["This field is required."]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug)]
pub enum ApiError {
    Validation(FieldErrors),
    /// Body that could not be read at all, reported as `{"detail": ...}`.
    BadRequest(String),
    Provision(ProvisionError),
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        ApiError::Provision(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::BadRequest(detail) => {
                tracing::debug!(%detail, "unreadable request body");
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Provision(err) => {
                let status = StatusCode::from_u16(err.status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                match &err {
                    ProvisionError::PermissionDenied { .. } | ProvisionError::Operation { .. } => {}
                    ProvisionError::Provider(cause) => {
                        tracing::error!(error = %cause, "provider call failed")
                    }
                    ProvisionError::Unexpected(cause) => {
                        tracing::error!(error = %format!("{:#}", cause), "unexpected failure")
                    }
                }
                (status, Json(err.to_string())).into_response()
            }
        }
    }
}
