use std::future::Future;
use std::sync::Arc;

use wpvm_common::constants::{SECURITY_GROUP_DESCRIPTION, SECURITY_GROUP_NAME};
use wpvm_common::{
    Credentials, IngressRule, InstanceDescriptor, InstanceStateChange, LaunchSpec, ProviderError,
    ProvisionError, SecurityGroupDescriptor,
};

use crate::dry_run::DryRunOutcome;
use crate::{Ec2Api, ProviderConnector, ProviderResult};

/// A provider session bound to one credential pair and one region.
///
/// Every mutating call goes through a dry run first: the real call is only
/// issued when the provider confirms it would succeed, so permission problems
/// surface before any state changes.
pub struct CredentialedClient {
    access_key_id: String,
    region: String,
    api: Arc<dyn Ec2Api>,
}

impl CredentialedClient {
    pub fn new(credentials: &Credentials, region: impl Into<String>, api: Arc<dyn Ec2Api>) -> Self {
        Self {
            access_key_id: credentials.id.clone(),
            region: region.into(),
            api,
        }
    }

    pub async fn connect(
        connector: &dyn ProviderConnector,
        credentials: &Credentials,
        region: &str,
    ) -> anyhow::Result<Self> {
        let api = connector.connect(credentials, region).await?;
        tracing::info!(
            provider = connector.name(),
            access_key_id = %credentials.id,
            region,
            "provider session created"
        );
        Ok(Self::new(credentials, region, api))
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Issues `call(true)`, then `call(false)` only if the dry run says it would succeed.
    async fn guarded<T, F, Fut>(&self, operation: &str, call: F) -> ProviderResult<T>
    where
        F: Fn(bool) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        match DryRunOutcome::from_result(call(true).await) {
            DryRunOutcome::WouldSucceed => call(false).await,
            DryRunOutcome::Denied(cause) => {
                tracing::debug!(operation, error = %cause, "dry run denied");
                Err(cause)
            }
            DryRunOutcome::Failed(cause) => {
                tracing::debug!(operation, error = %cause, "dry run failed");
                Err(cause)
            }
        }
    }

    pub async fn group_exists(&self, group_name: &str) -> Result<bool, ProvisionError> {
        let groups = self.api.describe_security_groups(group_name).await?;
        Ok(groups.iter().any(|group| group.name == group_name))
    }

    /// First VPC the provider lists, or an empty string when there is none.
    pub async fn resolve_default_network(&self) -> Result<String, ProvisionError> {
        let vpcs = self
            .guarded("DescribeVpcs", |dry_run| self.api.describe_vpcs(dry_run))
            .await?;
        Ok(vpcs.into_iter().next().unwrap_or_default())
    }

    /// Creates the WordPress security group and opens its ingress ports.
    ///
    /// The canonical name is used unless a group already carries it, in which
    /// case a random suffix is appended so creation never collides.
    pub async fn create_security_group(&self) -> Result<SecurityGroupDescriptor, ProvisionError> {
        let vpc_id = self.resolve_default_network().await?;

        let mut group_name = SECURITY_GROUP_NAME.to_string();
        if self.group_exists(SECURITY_GROUP_NAME).await? {
            group_name = format!("{}-{}", SECURITY_GROUP_NAME, uuid::Uuid::new_v4());
            tracing::info!(
                "Security group with name {} exists already, assigning new name {}",
                SECURITY_GROUP_NAME,
                group_name
            );
        }

        let group_id = self
            .guarded("CreateSecurityGroup", |dry_run| {
                self.api.create_security_group(
                    &group_name,
                    SECURITY_GROUP_DESCRIPTION,
                    &vpc_id,
                    dry_run,
                )
            })
            .await?;
        tracing::info!(
            "Security group with name {}, for VPC {}, created ({})",
            group_name,
            vpc_id,
            group_id
        );

        let rules = IngressRule::wordpress_defaults();
        self.guarded("AuthorizeSecurityGroupIngress", |dry_run| {
            self.api
                .authorize_security_group_ingress(&group_id, &rules, dry_run)
        })
        .await?;
        tracing::info!("Security group ingress assigned for group id {}", group_id);

        Ok(SecurityGroupDescriptor {
            id: group_id,
            name: group_name,
        })
    }

    /// Launches exactly one instance attached to `security_group_id`.
    pub async fn create_instance(
        &self,
        security_group_id: &str,
    ) -> Result<InstanceDescriptor, ProvisionError> {
        let spec = LaunchSpec::wordpress(security_group_id);
        let instances = self
            .guarded("RunInstances", |dry_run| {
                self.api.run_instances(&spec, dry_run)
            })
            .await?;

        // We only asked for one instance.
        let instance = instances.into_iter().next().ok_or_else(|| {
            ProvisionError::Unexpected(anyhow::anyhow!("RunInstances returned no instance"))
        })?;
        tracing::info!(
            "VM {} with AMI {}, type {} and security group {} launched",
            instance.id,
            spec.image_id,
            spec.instance_type,
            security_group_id
        );
        Ok(instance)
    }

    /// Looks an instance up. `Ok(None)` when the provider does not know it;
    /// `OperationError` when the provider could not be reached at all.
    pub async fn fetch_instance(
        &self,
        instance_id: &str,
    ) -> Result<Option<InstanceDescriptor>, ProvisionError> {
        match self.api.describe_instance(instance_id).await {
            Ok(found) => Ok(found),
            Err(ProviderError::Transport(reason)) => {
                tracing::warn!(instance_id, %reason, "instance lookup failed");
                Err(ProvisionError::instance_access())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn stop_instance(
        &self,
        instance: &InstanceDescriptor,
    ) -> Result<InstanceStateChange, ProvisionError> {
        let change = self
            .guarded("StopInstances", |dry_run| {
                self.api.stop_instances(&instance.id, dry_run)
            })
            .await?;
        tracing::info!(
            "Stop requested for instance {} ({} -> {})",
            instance.id,
            change.previous.name,
            change.current.name
        );
        Ok(change)
    }
}
