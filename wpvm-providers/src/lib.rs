use async_trait::async_trait;
use std::sync::Arc;
use wpvm_common::{
    Credentials, IngressRule, InstanceDescriptor, InstanceStateChange, LaunchSpec, ProviderError,
    SecurityGroupDescriptor,
};

pub mod client;
pub mod dry_run;

pub use client::CredentialedClient;
pub use dry_run::DryRunOutcome;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// EC2 call surface used by the credentialed client.
///
/// Every mutating call takes a `dry_run` flag. With `dry_run = true` a
/// provider validates the request and answers with a `DryRunOperation`
/// service error when the real call would have succeeded, as EC2 does.
#[async_trait]
pub trait Ec2Api: Send + Sync {
    /// Security groups whose name matches `group_name` exactly.
    async fn describe_security_groups(
        &self,
        group_name: &str,
    ) -> ProviderResult<Vec<SecurityGroupDescriptor>>;

    /// VPC ids visible to the credentials, in provider order.
    async fn describe_vpcs(&self, dry_run: bool) -> ProviderResult<Vec<String>>;

    /// Returns the new group's id. An empty `vpc_id` lets the provider pick its default VPC.
    async fn create_security_group(
        &self,
        group_name: &str,
        description: &str,
        vpc_id: &str,
        dry_run: bool,
    ) -> ProviderResult<String>;

    async fn authorize_security_group_ingress(
        &self,
        group_id: &str,
        rules: &[IngressRule],
        dry_run: bool,
    ) -> ProviderResult<()>;

    async fn run_instances(
        &self,
        spec: &LaunchSpec,
        dry_run: bool,
    ) -> ProviderResult<Vec<InstanceDescriptor>>;

    /// `Ok(None)` when the provider does not know the id.
    async fn describe_instance(&self, instance_id: &str)
        -> ProviderResult<Option<InstanceDescriptor>>;

    async fn stop_instances(
        &self,
        instance_id: &str,
        dry_run: bool,
    ) -> ProviderResult<InstanceStateChange>;
}

/// Builds a provider session bound to one credential pair and region.
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self, credentials: &Credentials, region: &str)
        -> anyhow::Result<Arc<dyn Ec2Api>>;
}

#[cfg(feature = "aws")]
pub mod aws;

#[cfg(feature = "mock")]
pub mod mock;
