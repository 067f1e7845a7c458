use serde::{Deserialize, Serialize};
use std::fmt;

pub mod constants;
pub mod error;
pub mod lifecycle;

pub use error::{classify, ProviderError, ProvisionError};
pub use lifecycle::{normalize, LifecycleState};

use constants::{ANYWHERE_CIDR, INSTANCE_TYPE, MSG_MISSING_CREDENTIALS, OPEN_TCP_PORTS, WORDPRESS_AMI};

// --- Credentials ---

/// Provider credential pair supplied by the caller on every request.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// Connectors refuse blank credential pairs before building a session.
    pub fn ensure_present(&self) -> anyhow::Result<()> {
        if self.id.trim().is_empty() || self.secret.trim().is_empty() {
            anyhow::bail!(MSG_MISSING_CREDENTIALS);
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// --- Provider resources ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupDescriptor {
    pub id: String,
    pub name: String,
}

/// One ingress permission on a security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub cidr: String,
}

impl IngressRule {
    pub fn tcp(port: u16, cidr: &str) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            cidr: cidr.to_string(),
        }
    }

    /// 80, 443 and 22 open to everyone.
    pub fn wordpress_defaults() -> Vec<Self> {
        OPEN_TCP_PORTS
            .iter()
            .map(|port| Self::tcp(*port, ANYWHERE_CIDR))
            .collect()
    }
}

/// Parameters of a RunInstances request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub image_id: String,
    pub instance_type: String,
    pub security_group_id: String,
    pub count: i32,
}

impl LaunchSpec {
    /// Exactly one WordPress instance, no key pair attached.
    pub fn wordpress(security_group_id: impl Into<String>) -> Self {
        Self {
            image_id: WORDPRESS_AMI.to_string(),
            instance_type: INSTANCE_TYPE.to_string(),
            security_group_id: security_group_id.into(),
            count: 1,
        }
    }
}

/// Lifecycle state as reported by the provider: numeric code plus raw name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceState {
    pub code: i32,
    pub name: String,
}

impl InstanceState {
    pub fn new(code: i32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        normalize(&self.name)
    }
}

impl From<LifecycleState> for InstanceState {
    fn from(state: LifecycleState) -> Self {
        Self::new(state.code(), state.as_str())
    }
}

/// Snapshot of a compute instance. Always re-fetched, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    pub id: String,
    pub instance_type: String,
    pub availability_zone: String,
    pub public_ip: Option<String>,
    pub state: InstanceState,
}

/// Result of a StopInstances call for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStateChange {
    pub instance_id: String,
    pub previous: InstanceState,
    pub current: InstanceState,
}

// --- API responses ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateVmResponse {
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    #[serde(rename = "InstanceType")]
    pub instance_type: String,
    /// Availability zone the instance was placed in.
    #[serde(rename = "Region")]
    pub region: String,
}

impl From<&InstanceDescriptor> for CreateVmResponse {
    fn from(instance: &InstanceDescriptor) -> Self {
        Self {
            instance_id: instance.id.clone(),
            instance_type: instance.instance_type.clone(),
            region: instance.availability_zone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct InstanceStatusResponse {
    #[serde(rename = "Code")]
    pub code: i32,
    /// Raw state name as reported by the provider.
    #[serde(rename = "Raw")]
    pub raw: String,
    /// Human readable label; empty when the state is not recognized.
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "PublicIP")]
    pub public_ip: Option<String>,
    #[serde(rename = "InstanceType")]
    pub instance_type: String,
    #[serde(rename = "Region")]
    pub region: String,
}

impl InstanceStatusResponse {
    pub fn new(instance: &InstanceDescriptor, state: &InstanceState) -> Self {
        Self {
            code: state.code,
            raw: state.name.clone(),
            name: state.label().to_string(),
            public_ip: instance.public_ip.clone(),
            instance_type: instance.instance_type.clone(),
            region: instance.availability_zone.clone(),
        }
    }
}
