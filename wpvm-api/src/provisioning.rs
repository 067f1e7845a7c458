// Provisioning workflow: create / stop / status for the single WordPress VM.
// Each entry point is a short sequence of credentialed-client calls; a failure
// at any step aborts the sequence without rollback.

use std::sync::Arc;

use wpvm_common::constants::{MSG_NO_EC2_ACCESS, MSG_STATUS_ERROR};
use wpvm_common::error::{STATUS_BAD_REQUEST, STATUS_UNAUTHORIZED};
use wpvm_common::{
    classify, CreateVmResponse, Credentials, InstanceDescriptor, InstanceStatusResponse,
    ProvisionError,
};
use wpvm_providers::CredentialedClient;

use crate::registry::ClientRegistry;

pub struct ProvisioningService {
    registry: Arc<ClientRegistry>,
}

impl ProvisioningService {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    async fn client_for(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<CredentialedClient>, ProvisionError> {
        self.registry
            .get_or_create(credentials)
            .await
            .ok_or_else(|| ProvisionError::permission_denied(MSG_NO_EC2_ACCESS, STATUS_UNAUTHORIZED))
    }

    /// Security group, then one instance attached to it.
    pub async fn create_vm(
        &self,
        credentials: &Credentials,
    ) -> Result<CreateVmResponse, ProvisionError> {
        let client = self.client_for(credentials).await?;

        let result = async {
            let group = client.create_security_group().await?;
            let instance = client.create_instance(&group.id).await?;
            Ok::<_, ProvisionError>(CreateVmResponse::from(&instance))
        }
        .await;

        result.map_err(classify)
    }

    pub async fn stop_instance(
        &self,
        instance_id: &str,
        credentials: &Credentials,
    ) -> Result<InstanceStatusResponse, ProvisionError> {
        let client = self.client_for(credentials).await?;

        let result = async {
            let instance = require_instance(client.fetch_instance(instance_id).await?)?;
            let change = client.stop_instance(&instance).await?;
            Ok::<_, ProvisionError>(InstanceStatusResponse::new(&instance, &change.current))
        }
        .await;

        result.map_err(classify)
    }

    pub async fn get_instance_status(
        &self,
        instance_id: &str,
        credentials: &Credentials,
    ) -> Result<InstanceStatusResponse, ProvisionError> {
        let client = self.client_for(credentials).await?;

        let result = async {
            let instance = require_instance(client.fetch_instance(instance_id).await?)?;
            Ok::<_, ProvisionError>(InstanceStatusResponse::new(&instance, &instance.state))
        }
        .await;

        result.map_err(classify)
    }
}

/// An id the provider cannot resolve is answered as a permission problem.
fn require_instance(
    instance: Option<InstanceDescriptor>,
) -> Result<InstanceDescriptor, ProvisionError> {
    instance.ok_or_else(|| ProvisionError::permission_denied(MSG_STATUS_ERROR, STATUS_BAD_REQUEST))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryMode;
    use wpvm_common::ProviderError;
    use wpvm_providers::mock::{instance_fixture, Ec2Operation, MockConnector, MockEc2};
    use wpvm_common::LifecycleState;

    fn service(ec2: &Arc<MockEc2>) -> ProvisioningService {
        let connector = Arc::new(MockConnector::new(ec2.clone()));
        let registry = ClientRegistry::new(connector, "eu-west-1", RegistryMode::Singleton);
        ProvisioningService::new(Arc::new(registry))
    }

    fn creds() -> Credentials {
        Credentials::new("AKIATEST", "secret")
    }

    #[tokio::test]
    async fn create_vm_builds_group_then_instance() {
        let ec2 = Arc::new(MockEc2::with_default_vpc("eu-west-1"));
        let svc = service(&ec2);

        let resp = svc.create_vm(&creds()).await.unwrap();

        assert!(resp.instance_id.starts_with("i-"));
        assert_eq!(resp.instance_type, "t2.micro");
        assert_eq!(resp.region, "eu-west-1a");
        let groups = ec2.security_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "bitnami-wordpress-sg");
        assert_eq!(ec2.ingress_rules(&groups[0].id).len(), 3);
    }

    #[tokio::test]
    async fn create_vm_denied_dry_run_is_permission_denied() {
        let ec2 = Arc::new(MockEc2::with_default_vpc("eu-west-1"));
        ec2.deny(Ec2Operation::CreateSecurityGroup);
        let svc = service(&ec2);

        let err = svc.create_vm(&creds()).await.unwrap_err();

        assert!(err.is_permission_denied());
        assert_eq!(err.status(), 401);
        assert_eq!(err.to_string(), "You don't have permissions to perform this operation");
        assert_eq!(ec2.real_calls(Ec2Operation::RunInstances), 0);
    }

    #[tokio::test]
    async fn create_vm_passes_other_provider_errors_through() {
        let ec2 = Arc::new(MockEc2::with_default_vpc("eu-west-1"));
        let missing_ami =
            ProviderError::service("RunInstances", "InvalidAMIID.NotFound", "The image id does not exist");
        ec2.fail_with(Ec2Operation::RunInstances, missing_ami.clone());
        let svc = service(&ec2);

        let err = svc.create_vm(&creds()).await.unwrap_err();

        match err {
            ProvisionError::Provider(cause) => assert_eq!(cause, missing_ami),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn unusable_registry_means_permission_denied() {
        let ec2 = Arc::new(MockEc2::with_default_vpc("eu-west-1"));
        let connector = Arc::new(MockConnector::refusing(ec2));
        let registry = ClientRegistry::new(connector, "eu-west-1", RegistryMode::Singleton);
        let svc = ProvisioningService::new(Arc::new(registry));

        let err = svc.get_instance_status("i-1", &creds()).await.unwrap_err();

        assert!(err.is_permission_denied());
        assert_eq!(err.status(), 401);
        assert_eq!(err.to_string(), MSG_NO_EC2_ACCESS);
    }

    #[tokio::test]
    async fn stop_unknown_instance_is_permission_denied() {
        let ec2 = Arc::new(MockEc2::with_default_vpc("eu-west-1"));
        let svc = service(&ec2);

        let err = svc.stop_instance("i-doesnotexist", &creds()).await.unwrap_err();

        assert!(err.is_permission_denied());
        assert_eq!(err.to_string(), MSG_STATUS_ERROR);
        assert_eq!(ec2.real_calls(Ec2Operation::StopInstances), 0);
    }

    #[tokio::test]
    async fn stop_reports_transition_state() {
        let ec2 = Arc::new(MockEc2::with_default_vpc("eu-west-1"));
        ec2.add_instance(instance_fixture("i-web", LifecycleState::Running));
        let svc = service(&ec2);

        let resp = svc.stop_instance("i-web", &creds()).await.unwrap();

        assert_eq!(resp.code, 64);
        assert_eq!(resp.raw, "stopping");
        assert_eq!(resp.name, "Stopping server");
        assert_eq!(resp.public_ip.as_deref(), Some("34.245.10.20"));
        assert_eq!(resp.region, "eu-west-1a");
    }

    #[tokio::test]
    async fn status_reads_without_mutation() {
        let ec2 = Arc::new(MockEc2::with_default_vpc("eu-west-1"));
        ec2.add_instance(instance_fixture("i-web", LifecycleState::Running));
        let svc = service(&ec2);

        let resp = svc.get_instance_status("i-web", &creds()).await.unwrap();

        assert_eq!(resp.code, 16);
        assert_eq!(resp.raw, "running");
        assert_eq!(resp.name, "Server up and running");
        assert_eq!(ec2.instance("i-web").unwrap().state.name, "running");
        assert!(ec2.calls().iter().all(|call| call.operation == Ec2Operation::DescribeInstances));
    }

    #[tokio::test]
    async fn status_lookup_denied_is_permission_denied() {
        let ec2 = Arc::new(MockEc2::with_default_vpc("eu-west-1"));
        ec2.fail_with(
            Ec2Operation::DescribeInstances,
            ProviderError::service("DescribeInstances", "AuthFailure", "AWS was not able to validate the provided access credentials"),
        );
        let svc = service(&ec2);

        let err = svc.get_instance_status("i-web", &creds()).await.unwrap_err();

        assert!(err.is_permission_denied());
        assert_eq!(err.status(), 401);
    }
}
