use serde::{Deserialize, Serialize};

/// Instance lifecycle states as reported by EC2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Pending,
    Running,
    ShuttingDown,
    Stopped,
    Stopping,
    Terminated,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Terminated => "terminated",
        }
    }

    /// Exact match on the raw provider name; EC2 never varies the casing.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(LifecycleState::Pending),
            "running" => Some(LifecycleState::Running),
            "shutting-down" => Some(LifecycleState::ShuttingDown),
            "stopped" => Some(LifecycleState::Stopped),
            "stopping" => Some(LifecycleState::Stopping),
            "terminated" => Some(LifecycleState::Terminated),
            _ => None,
        }
    }

    /// Label shown to the caller.
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Pending => "Launching server",
            LifecycleState::Running => "Server up and running",
            LifecycleState::ShuttingDown => "Shutting down server",
            LifecycleState::Stopped => "Server stopped",
            LifecycleState::Stopping => "Stopping server",
            LifecycleState::Terminated => "Server is terminated",
        }
    }

    /// Numeric code EC2 pairs with each state name.
    pub fn code(&self) -> i32 {
        match self {
            LifecycleState::Pending => 0,
            LifecycleState::Running => 16,
            LifecycleState::ShuttingDown => 32,
            LifecycleState::Terminated => 48,
            LifecycleState::Stopping => 64,
            LifecycleState::Stopped => 80,
        }
    }

    pub const ALL: [LifecycleState; 6] = [
        LifecycleState::Pending,
        LifecycleState::Running,
        LifecycleState::ShuttingDown,
        LifecycleState::Stopped,
        LifecycleState::Stopping,
        LifecycleState::Terminated,
    ];
}

/// Maps a raw provider state name to its caller-facing label.
/// Unknown names map to the empty string, which callers treat as "unrecognized".
pub fn normalize(raw_state: &str) -> &'static str {
    LifecycleState::parse(raw_state)
        .map(|state| state.label())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_states_have_fixed_labels() {
        for (raw, label) in [
            ("pending", "Launching server"),
            ("running", "Server up and running"),
            ("shutting-down", "Shutting down server"),
            ("stopped", "Server stopped"),
            ("stopping", "Stopping server"),
            ("terminated", "Server is terminated"),
        ] {
            assert_eq!(normalize(raw), label);
        }
    }

    #[test]
    fn unknown_states_normalize_to_empty() {
        for raw in ["", "RUNNING", "rebooting", "shutting_down", " running"] {
            assert_eq!(normalize(raw), "");
        }
    }

    #[test]
    fn parse_roundtrip() {
        for state in LifecycleState::ALL {
            assert_eq!(LifecycleState::parse(state.as_str()), Some(state));
        }
        assert_eq!(LifecycleState::parse("unknown"), None);
    }

    #[test]
    fn serde_uses_provider_names() {
        let json = serde_json::to_string(&LifecycleState::ShuttingDown).unwrap();
        assert_eq!(json, "\"shutting-down\"");
    }
}
