use wpvm_common::ProviderError;

/// What a dry-run call told us about the real call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DryRunOutcome {
    /// The provider answered `DryRunOperation`: the real call would succeed.
    WouldSucceed,
    /// The credentials are not allowed to perform the call.
    Denied(ProviderError),
    /// Any other failure (validation, quota, transport...).
    Failed(ProviderError),
}

impl DryRunOutcome {
    pub fn from_result<T>(result: Result<T, ProviderError>) -> Self {
        match result {
            // A provider that ignores the flag and succeeds still means "go ahead".
            Ok(_) => DryRunOutcome::WouldSucceed,
            Err(err) if err.is_dry_run_success() => DryRunOutcome::WouldSucceed,
            Err(err) if err.is_permission_error() => DryRunOutcome::Denied(err),
            Err(err) => DryRunOutcome::Failed(err),
        }
    }

    /// `Ok(())` only when the real call may be issued.
    pub fn into_result(self) -> Result<(), ProviderError> {
        match self {
            DryRunOutcome::WouldSucceed => Ok(()),
            DryRunOutcome::Denied(cause) | DryRunOutcome::Failed(cause) => Err(cause),
        }
    }
}
