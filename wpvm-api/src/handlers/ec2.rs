use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;
use wpvm_common::{CreateVmResponse, Credentials, InstanceStatusResponse};

use crate::app::state::AppState;
use crate::error::{ApiError, FieldErrors};
use crate::extract::FormOrJson;

pub const MAX_FIELD_LENGTH: usize = 128;

// --- DTOs ---

// Fields stay loosely typed so scalars are coerced and wrong shapes are
// reported per field instead of failing the whole body.

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VmRequest {
    /// AWS access key id
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub client_id: Option<Value>,
    /// AWS secret access key
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub client_secret: Option<Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct InstanceRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub client_id: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub client_secret: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub instance_id: Option<Value>,
}

// --- Validation ---

/// Collects per-field errors; every field is checked before failing.
#[derive(Default)]
struct Validator {
    errors: FieldErrors,
}

impl Validator {
    fn required(&mut self, field: &str, value: Option<&Value>) -> String {
        let value = match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => {
                self.push(field, "Not a valid string.".to_string());
                return String::new();
            }
        };
        if value.is_empty() {
            self.push(field, "This field is required.".to_string());
        } else if value.chars().count() > MAX_FIELD_LENGTH {
            self.push(
                field,
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    MAX_FIELD_LENGTH,
                    value.chars().count()
                ),
            );
        }
        value
    }

    fn push(&mut self, field: &str, message: String) {
        self.errors.entry(field.to_string()).or_default().push(message);
    }

    fn finish<T>(self, value: T) -> Result<T, ApiError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

impl VmRequest {
    pub fn validate(&self) -> Result<Credentials, ApiError> {
        let mut v = Validator::default();
        let id = v.required("client_id", self.client_id.as_ref());
        let secret = v.required("client_secret", self.client_secret.as_ref());
        v.finish(Credentials::new(id, secret))
    }
}

impl InstanceRequest {
    pub fn validate(&self) -> Result<(Credentials, String), ApiError> {
        let mut v = Validator::default();
        let id = v.required("client_id", self.client_id.as_ref());
        let secret = v.required("client_secret", self.client_secret.as_ref());
        let instance_id = v.required("instance_id", self.instance_id.as_ref());
        v.finish((Credentials::new(id, secret), instance_id))
    }
}

// --- Handlers ---

#[utoipa::path(
    post,
    path = "/create",
    tag = "EC2",
    request_body = VmRequest,
    responses(
        (status = 200, description = "Instance launched", body = CreateVmResponse),
        (status = 400, description = "Validation errors or unreadable body"),
        (status = 401, description = "Credentials lack EC2 permissions", body = String),
        (status = 500, description = "Provider or unexpected failure", body = String)
    )
)]
pub async fn create_vm(
    State(state): State<Arc<AppState>>,
    FormOrJson(req): FormOrJson<VmRequest>,
) -> Result<Json<CreateVmResponse>, ApiError> {
    let credentials = req.validate()?;
    let created = state.provisioning.create_vm(&credentials).await?;
    tracing::info!(instance_id = %created.instance_id, zone = %created.region, "VM created");
    Ok(Json(created))
}

#[utoipa::path(
    post,
    path = "/check-status",
    tag = "EC2",
    request_body = InstanceRequest,
    responses(
        (status = 200, description = "Current instance state", body = InstanceStatusResponse),
        (status = 400, description = "Validation errors or unknown instance"),
        (status = 401, description = "Credentials lack EC2 permissions", body = String),
        (status = 500, description = "Provider or unexpected failure", body = String)
    )
)]
pub async fn check_status(
    State(state): State<Arc<AppState>>,
    FormOrJson(req): FormOrJson<InstanceRequest>,
) -> Result<Json<InstanceStatusResponse>, ApiError> {
    let (credentials, instance_id) = req.validate()?;
    let status = state
        .provisioning
        .get_instance_status(&instance_id, &credentials)
        .await?;
    Ok(Json(status))
}

#[utoipa::path(
    post,
    path = "/stop-instance",
    tag = "EC2",
    request_body = InstanceRequest,
    responses(
        (status = 200, description = "Stop requested; state after the transition", body = InstanceStatusResponse),
        (status = 400, description = "Validation errors or unknown instance"),
        (status = 401, description = "Credentials lack EC2 permissions", body = String),
        (status = 500, description = "Provider or unexpected failure", body = String)
    )
)]
pub async fn stop_instance(
    State(state): State<Arc<AppState>>,
    FormOrJson(req): FormOrJson<InstanceRequest>,
) -> Result<Json<InstanceStatusResponse>, ApiError> {
    let (credentials, instance_id) = req.validate()?;
    let status = state
        .provisioning
        .stop_instance(&instance_id, &credentials)
        .await?;
    tracing::info!(instance_id = %instance_id, state = %status.raw, "stop requested");
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors_of(result: Result<impl std::fmt::Debug, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_are_required() {
        let errors = errors_of(VmRequest::default().validate());
        assert_eq!(errors["client_id"], vec!["This field is required."]);
        assert_eq!(errors["client_secret"], vec!["This field is required."]);

        let errors = errors_of(InstanceRequest::default().validate());
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let req = VmRequest {
            client_id: Some(json!("   ")),
            client_secret: Some(json!("secret")),
        };
        let errors = errors_of(req.validate());
        assert!(errors.contains_key("client_id"));
        assert!(!errors.contains_key("client_secret"));
    }

    #[test]
    fn overlong_values_are_rejected() {
        let req = VmRequest {
            client_id: Some(json!("a".repeat(129))),
            client_secret: Some(json!("b".repeat(128))),
        };
        let errors = errors_of(req.validate());
        assert_eq!(
            errors["client_id"],
            vec!["Ensure this value has at most 128 characters (it has 129)."]
        );
        assert!(!errors.contains_key("client_secret"));
    }

    #[test]
    fn valid_request_yields_trimmed_values() {
        let req = InstanceRequest {
            client_id: Some(json!(" AKIA ")),
            client_secret: Some(json!("secret")),
            instance_id: Some(json!("i-0123\n")),
        };
        let (credentials, instance_id) = req.validate().unwrap();
        assert_eq!(credentials, Credentials::new("AKIA", "secret"));
        assert_eq!(instance_id, "i-0123");
    }

    #[test]
    fn scalars_are_coerced_and_containers_rejected() {
        let req = InstanceRequest {
            client_id: Some(json!(12345)),
            client_secret: Some(json!(true)),
            instance_id: Some(json!(["i-0123"])),
        };
        let errors = errors_of(req.validate());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["instance_id"], vec!["Not a valid string."]);

        let req = VmRequest {
            client_id: Some(json!(12345)),
            client_secret: Some(Value::Null),
        };
        let errors = errors_of(req.validate());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["client_secret"], vec!["This field is required."]);
    }
}
