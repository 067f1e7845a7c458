use thiserror::Error;

use crate::constants::{
    AUTH_FAILURE, DRY_RUN_OPERATION, MSG_INSTANCE_ACCESS, MSG_OPERATION_DENIED,
    UNAUTHORIZED_OPERATION,
};

pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_UNAUTHORIZED: u16 = 401;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Error reported by the cloud provider call boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with an error code.
    #[error("An error occurred ({code}) when calling the {operation} operation: {message}")]
    Service {
        operation: String,
        code: String,
        message: String,
    },

    /// The request never got a provider answer (network, signing, timeout...).
    #[error("{0}")]
    Transport(String),
}

impl ProviderError {
    pub fn service(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ProviderError::Service {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Provider-assigned error code, if the provider answered at all.
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Service { code, .. } => Some(code),
            ProviderError::Transport(_) => None,
        }
    }

    pub fn is_dry_run_success(&self) -> bool {
        self.code() == Some(DRY_RUN_OPERATION)
    }

    pub fn is_permission_error(&self) -> bool {
        matches!(self.code(), Some(UNAUTHORIZED_OPERATION) | Some(AUTH_FAILURE))
    }
}

/// Errors surfaced by the provisioning workflow.
///
/// `PermissionDenied` and `Operation` are the closed set of domain errors and
/// carry the HTTP status the boundary must answer with. `Provider` and
/// `Unexpected` are passed through untouched and answered as generic failures.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("{message}")]
    PermissionDenied { message: String, status: u16 },

    #[error("{message}")]
    Operation { message: String, status: u16 },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ProvisionError {
    pub fn permission_denied(message: impl Into<String>, status: u16) -> Self {
        let message = message.into();
        tracing::warn!("{}", message);
        ProvisionError::PermissionDenied { message, status }
    }

    pub fn operation(message: impl Into<String>, status: u16) -> Self {
        let message = message.into();
        tracing::warn!("{}", message);
        ProvisionError::Operation { message, status }
    }

    pub fn instance_access() -> Self {
        Self::operation(MSG_INSTANCE_ACCESS, STATUS_INTERNAL_SERVER_ERROR)
    }

    /// HTTP status the boundary answers with.
    pub fn status(&self) -> u16 {
        match self {
            ProvisionError::PermissionDenied { status, .. }
            | ProvisionError::Operation { status, .. } => *status,
            ProvisionError::Provider(_) | ProvisionError::Unexpected(_) => {
                STATUS_INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ProvisionError::PermissionDenied { .. })
    }
}

/// Reclassifies provider permission failures into `PermissionDenied`.
/// Any other error is handed back unchanged.
pub fn classify(error: ProvisionError) -> ProvisionError {
    match error {
        ProvisionError::Provider(ref cause) if cause.is_permission_error() => {
            ProvisionError::permission_denied(MSG_OPERATION_DENIED, STATUS_UNAUTHORIZED)
        }
        other => other,
    }
}
