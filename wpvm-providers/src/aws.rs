use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::config::{Credentials as AwsCredentials, Region};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::{Filter, Instance, InstanceType, IpPermission, IpRange};
use aws_sdk_ec2::Client;
use wpvm_common::constants::{INSTANCE_ID_MALFORMED, INSTANCE_NOT_FOUND};
use wpvm_common::{
    Credentials, IngressRule, InstanceDescriptor, InstanceState, InstanceStateChange, LaunchSpec,
    ProviderError, SecurityGroupDescriptor,
};

use crate::{Ec2Api, ProviderConnector, ProviderResult};

/// EC2 backed by the AWS SDK, one client per credential pair.
pub struct AwsEc2 {
    client: Client,
}

impl AwsEc2 {
    pub async fn new(credentials: &Credentials, region: &str) -> Result<Self> {
        credentials.ensure_present()?;
        let static_credentials = AwsCredentials::new(
            credentials.id.trim(),
            credentials.secret.trim(),
            None,
            None,
            "wpvm-request",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(static_credentials)
            .load()
            .await;
        Ok(Self {
            client: Client::new(&sdk_config),
        })
    }
}

/// Converts an SDK failure into a provider error, keeping the EC2 error code when there is one.
fn provider_error<E, R>(operation: &str, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some(code) => ProviderError::service(operation, code, err.message().unwrap_or_default()),
        None => ProviderError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

fn state_of(state: Option<&aws_sdk_ec2::types::InstanceState>) -> InstanceState {
    match state {
        Some(state) => InstanceState::new(
            state.code().unwrap_or_default(),
            state.name().map(|name| name.as_str()).unwrap_or_default(),
        ),
        None => InstanceState::new(0, ""),
    }
}

fn descriptor_of(instance: &Instance) -> InstanceDescriptor {
    InstanceDescriptor {
        id: instance.instance_id().unwrap_or_default().to_string(),
        instance_type: instance
            .instance_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        availability_zone: instance
            .placement()
            .and_then(|p| p.availability_zone())
            .unwrap_or_default()
            .to_string(),
        public_ip: instance.public_ip_address().map(str::to_string),
        state: state_of(instance.state()),
    }
}

fn ip_permission_of(rule: &IngressRule) -> IpPermission {
    IpPermission::builder()
        .ip_protocol(rule.protocol.as_str())
        .from_port(i32::from(rule.from_port))
        .to_port(i32::from(rule.to_port))
        .ip_ranges(IpRange::builder().cidr_ip(rule.cidr.as_str()).build())
        .build()
}

#[async_trait]
impl Ec2Api for AwsEc2 {
    async fn describe_security_groups(
        &self,
        group_name: &str,
    ) -> ProviderResult<Vec<SecurityGroupDescriptor>> {
        let out = self
            .client
            .describe_security_groups()
            .filters(Filter::builder().name("group-name").values(group_name).build())
            .send()
            .await
            .map_err(|e| provider_error("DescribeSecurityGroups", e))?;
        Ok(out
            .security_groups()
            .iter()
            .map(|group| SecurityGroupDescriptor {
                id: group.group_id().unwrap_or_default().to_string(),
                name: group.group_name().unwrap_or_default().to_string(),
            })
            .collect())
    }

    async fn describe_vpcs(&self, dry_run: bool) -> ProviderResult<Vec<String>> {
        let out = self
            .client
            .describe_vpcs()
            .dry_run(dry_run)
            .send()
            .await
            .map_err(|e| provider_error("DescribeVpcs", e))?;
        Ok(out
            .vpcs()
            .iter()
            .filter_map(|vpc| vpc.vpc_id().map(str::to_string))
            .collect())
    }

    async fn create_security_group(
        &self,
        group_name: &str,
        description: &str,
        vpc_id: &str,
        dry_run: bool,
    ) -> ProviderResult<String> {
        let vpc_id = Some(vpc_id.to_string()).filter(|id| !id.is_empty());
        let out = self
            .client
            .create_security_group()
            .group_name(group_name)
            .description(description)
            .set_vpc_id(vpc_id)
            .dry_run(dry_run)
            .send()
            .await
            .map_err(|e| provider_error("CreateSecurityGroup", e))?;
        Ok(out.group_id().unwrap_or_default().to_string())
    }

    async fn authorize_security_group_ingress(
        &self,
        group_id: &str,
        rules: &[IngressRule],
        dry_run: bool,
    ) -> ProviderResult<()> {
        self.client
            .authorize_security_group_ingress()
            .group_id(group_id)
            .set_ip_permissions(Some(rules.iter().map(ip_permission_of).collect()))
            .dry_run(dry_run)
            .send()
            .await
            .map_err(|e| provider_error("AuthorizeSecurityGroupIngress", e))?;
        Ok(())
    }

    async fn run_instances(
        &self,
        spec: &LaunchSpec,
        dry_run: bool,
    ) -> ProviderResult<Vec<InstanceDescriptor>> {
        // No key_name: the instance is only reachable through the opened ports.
        let out = self
            .client
            .run_instances()
            .image_id(&spec.image_id)
            .instance_type(InstanceType::from(spec.instance_type.as_str()))
            .min_count(spec.count)
            .max_count(spec.count)
            .security_group_ids(&spec.security_group_id)
            .dry_run(dry_run)
            .send()
            .await
            .map_err(|e| provider_error("RunInstances", e))?;
        Ok(out.instances().iter().map(descriptor_of).collect())
    }

    async fn describe_instance(
        &self,
        instance_id: &str,
    ) -> ProviderResult<Option<InstanceDescriptor>> {
        let result = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await;
        let out = match result {
            Ok(out) => out,
            Err(err) if matches!(err.code(), Some(INSTANCE_NOT_FOUND) | Some(INSTANCE_ID_MALFORMED)) => {
                return Ok(None)
            }
            Err(err) => return Err(provider_error("DescribeInstances", err)),
        };
        Ok(out
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .find(|instance| instance.instance_id() == Some(instance_id))
            .map(descriptor_of))
    }

    async fn stop_instances(
        &self,
        instance_id: &str,
        dry_run: bool,
    ) -> ProviderResult<InstanceStateChange> {
        let out = self
            .client
            .stop_instances()
            .instance_ids(instance_id)
            .dry_run(dry_run)
            .send()
            .await
            .map_err(|e| provider_error("StopInstances", e))?;
        let change = out.stopping_instances().first().ok_or_else(|| {
            ProviderError::Transport(format!(
                "StopInstances returned no state change for {}",
                instance_id
            ))
        })?;
        Ok(InstanceStateChange {
            instance_id: change.instance_id().unwrap_or(instance_id).to_string(),
            previous: state_of(change.previous_state()),
            current: state_of(change.current_state()),
        })
    }
}

pub struct AwsConnector;

#[async_trait]
impl ProviderConnector for AwsConnector {
    fn name(&self) -> &str {
        "aws"
    }

    async fn connect(&self, credentials: &Credentials, region: &str) -> Result<Arc<dyn Ec2Api>> {
        Ok(Arc::new(AwsEc2::new(credentials, region).await?))
    }
}
