use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use wpvm_common::constants::{
    DRY_RUN_OPERATION, INSTANCE_NOT_FOUND, INSTANCE_TYPE, UNAUTHORIZED_OPERATION,
};
use wpvm_common::{
    Credentials, IngressRule, InstanceDescriptor, InstanceState, InstanceStateChange, LaunchSpec,
    LifecycleState, ProviderError, SecurityGroupDescriptor,
};

use crate::{Ec2Api, ProviderConnector, ProviderResult};

/// EC2 operations the mock can record, deny or fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ec2Operation {
    DescribeSecurityGroups,
    DescribeVpcs,
    CreateSecurityGroup,
    AuthorizeSecurityGroupIngress,
    RunInstances,
    DescribeInstances,
    StopInstances,
}

impl Ec2Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ec2Operation::DescribeSecurityGroups => "DescribeSecurityGroups",
            Ec2Operation::DescribeVpcs => "DescribeVpcs",
            Ec2Operation::CreateSecurityGroup => "CreateSecurityGroup",
            Ec2Operation::AuthorizeSecurityGroupIngress => "AuthorizeSecurityGroupIngress",
            Ec2Operation::RunInstances => "RunInstances",
            Ec2Operation::DescribeInstances => "DescribeInstances",
            Ec2Operation::StopInstances => "StopInstances",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: Ec2Operation,
    pub dry_run: bool,
}

#[derive(Default)]
struct MockState {
    vpcs: Vec<String>,
    groups: Vec<SecurityGroupDescriptor>,
    ingress: HashMap<String, Vec<IngressRule>>,
    instances: BTreeMap<String, InstanceDescriptor>,
    denied: HashSet<Ec2Operation>,
    faults: HashMap<Ec2Operation, ProviderError>,
    calls: Vec<RecordedCall>,
}

/// In-memory EC2 double.
///
/// Dry runs answer `DryRunOperation` unless the operation was denied
/// (`UnauthorizedOperation`) or given a fault, so the dry-run protocol runs
/// exactly as against EC2.
pub struct MockEc2 {
    region: String,
    state: Mutex<MockState>,
}

impl MockEc2 {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// A mock with one default VPC, which is what a fresh AWS account looks like.
    pub fn with_default_vpc(region: impl Into<String>) -> Self {
        let mock = Self::new(region);
        mock.add_vpc("vpc-0mock0default");
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_vpc(&self, vpc_id: &str) {
        self.state().vpcs.push(vpc_id.to_string());
    }

    pub fn add_security_group(&self, group_name: &str) -> SecurityGroupDescriptor {
        let group = SecurityGroupDescriptor {
            id: new_id("sg-"),
            name: group_name.to_string(),
        };
        self.state().groups.push(group.clone());
        group
    }

    pub fn add_instance(&self, instance: InstanceDescriptor) {
        self.state().instances.insert(instance.id.clone(), instance);
    }

    /// Makes `operation` answer `UnauthorizedOperation`, dry run or not.
    pub fn deny(&self, operation: Ec2Operation) {
        self.state().denied.insert(operation);
    }

    /// Makes `operation` fail with `error`, dry run or not.
    pub fn fail_with(&self, operation: Ec2Operation, error: ProviderError) {
        self.state().faults.insert(operation, error);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of non dry-run calls made for `operation`.
    pub fn real_calls(&self, operation: Ec2Operation) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.operation == operation && !call.dry_run)
            .count()
    }

    pub fn security_groups(&self) -> Vec<SecurityGroupDescriptor> {
        self.state().groups.clone()
    }

    pub fn ingress_rules(&self, group_id: &str) -> Vec<IngressRule> {
        self.state().ingress.get(group_id).cloned().unwrap_or_default()
    }

    pub fn instance(&self, instance_id: &str) -> Option<InstanceDescriptor> {
        self.state().instances.get(instance_id).cloned()
    }

    /// Records the call and applies denials, faults and the dry-run answer.
    fn enter(&self, operation: Ec2Operation, dry_run: bool) -> ProviderResult<()> {
        let mut state = self.state();
        state.calls.push(RecordedCall { operation, dry_run });

        if let Some(fault) = state.faults.get(&operation) {
            return Err(fault.clone());
        }
        if state.denied.contains(&operation) {
            return Err(ProviderError::service(
                operation.as_str(),
                UNAUTHORIZED_OPERATION,
                "You are not authorized to perform this operation.",
            ));
        }
        if dry_run {
            return Err(ProviderError::service(
                operation.as_str(),
                DRY_RUN_OPERATION,
                "Request would have succeeded, but DryRun flag is set.",
            ));
        }
        Ok(())
    }
}

fn new_id(prefix: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &hex[..17])
}

#[async_trait]
impl Ec2Api for MockEc2 {
    async fn describe_security_groups(
        &self,
        group_name: &str,
    ) -> ProviderResult<Vec<SecurityGroupDescriptor>> {
        self.enter(Ec2Operation::DescribeSecurityGroups, false)?;
        Ok(self
            .state()
            .groups
            .iter()
            .filter(|group| group.name == group_name)
            .cloned()
            .collect())
    }

    async fn describe_vpcs(&self, dry_run: bool) -> ProviderResult<Vec<String>> {
        self.enter(Ec2Operation::DescribeVpcs, dry_run)?;
        Ok(self.state().vpcs.clone())
    }

    async fn create_security_group(
        &self,
        group_name: &str,
        _description: &str,
        _vpc_id: &str,
        dry_run: bool,
    ) -> ProviderResult<String> {
        self.enter(Ec2Operation::CreateSecurityGroup, dry_run)?;
        let mut state = self.state();
        if state.groups.iter().any(|group| group.name == group_name) {
            return Err(ProviderError::service(
                Ec2Operation::CreateSecurityGroup.as_str(),
                "InvalidGroup.Duplicate",
                format!("The security group '{}' already exists", group_name),
            ));
        }
        let group = SecurityGroupDescriptor {
            id: new_id("sg-"),
            name: group_name.to_string(),
        };
        let id = group.id.clone();
        state.groups.push(group);
        Ok(id)
    }

    async fn authorize_security_group_ingress(
        &self,
        group_id: &str,
        rules: &[IngressRule],
        dry_run: bool,
    ) -> ProviderResult<()> {
        self.enter(Ec2Operation::AuthorizeSecurityGroupIngress, dry_run)?;
        let mut state = self.state();
        if !state.groups.iter().any(|group| group.id == group_id) {
            return Err(ProviderError::service(
                Ec2Operation::AuthorizeSecurityGroupIngress.as_str(),
                "InvalidGroup.NotFound",
                format!("The security group '{}' does not exist", group_id),
            ));
        }
        state
            .ingress
            .entry(group_id.to_string())
            .or_default()
            .extend_from_slice(rules);
        Ok(())
    }

    async fn run_instances(
        &self,
        spec: &LaunchSpec,
        dry_run: bool,
    ) -> ProviderResult<Vec<InstanceDescriptor>> {
        self.enter(Ec2Operation::RunInstances, dry_run)?;
        let mut state = self.state();
        let launched: Vec<InstanceDescriptor> = (0..spec.count.max(0))
            .map(|_| InstanceDescriptor {
                id: new_id("i-"),
                instance_type: spec.instance_type.clone(),
                availability_zone: format!("{}a", self.region),
                public_ip: None,
                state: LifecycleState::Pending.into(),
            })
            .collect();
        for instance in &launched {
            state.instances.insert(instance.id.clone(), instance.clone());
        }
        Ok(launched)
    }

    async fn describe_instance(
        &self,
        instance_id: &str,
    ) -> ProviderResult<Option<InstanceDescriptor>> {
        self.enter(Ec2Operation::DescribeInstances, false)?;
        Ok(self.state().instances.get(instance_id).cloned())
    }

    async fn stop_instances(
        &self,
        instance_id: &str,
        dry_run: bool,
    ) -> ProviderResult<InstanceStateChange> {
        self.enter(Ec2Operation::StopInstances, dry_run)?;
        let mut state = self.state();
        let instance = state.instances.get_mut(instance_id).ok_or_else(|| {
            ProviderError::service(
                Ec2Operation::StopInstances.as_str(),
                INSTANCE_NOT_FOUND,
                format!("The instance ID '{}' does not exist", instance_id),
            )
        })?;

        let previous = instance.state.clone();
        let current: InstanceState = match LifecycleState::parse(&previous.name) {
            Some(LifecycleState::Stopped) => LifecycleState::Stopped.into(),
            Some(LifecycleState::Terminated) => LifecycleState::Terminated.into(),
            _ => LifecycleState::Stopping.into(),
        };
        instance.state = current.clone();
        Ok(InstanceStateChange {
            instance_id: instance_id.to_string(),
            previous,
            current,
        })
    }
}

/// Hands out sessions backed by one shared [`MockEc2`].
pub struct MockConnector {
    ec2: Arc<MockEc2>,
    connects: AtomicUsize,
    refuse: bool,
    delays: Mutex<HashMap<String, Duration>>,
}

impl MockConnector {
    pub fn new(ec2: Arc<MockEc2>) -> Self {
        Self {
            ec2,
            connects: AtomicUsize::new(0),
            refuse: false,
            delays: Mutex::new(HashMap::new()),
        }
    }

    /// A connector whose every session construction fails.
    pub fn refusing(ec2: Arc<MockEc2>) -> Self {
        Self {
            refuse: true,
            ..Self::new(ec2)
        }
    }

    pub fn ec2(&self) -> Arc<MockEc2> {
        self.ec2.clone()
    }

    /// Number of sessions built so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Slows down session construction for one access key.
    pub fn delay_connect(&self, access_key_id: impl Into<String>, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(access_key_id.into(), delay);
    }

    fn delay_for(&self, access_key_id: &str) -> Option<Duration> {
        self.delays
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(access_key_id)
            .copied()
    }
}

#[async_trait]
impl ProviderConnector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(
        &self,
        credentials: &Credentials,
        _region: &str,
    ) -> anyhow::Result<Arc<dyn Ec2Api>> {
        credentials.ensure_present()?;
        if let Some(delay) = self.delay_for(&credentials.id) {
            tokio::time::sleep(delay).await;
        }
        if self.refuse {
            anyhow::bail!("mock connector refused to build a session");
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.ec2.clone())
    }
}

/// Instance fixture matching what RunInstances returns for the WordPress launch template.
pub fn instance_fixture(instance_id: &str, state: LifecycleState) -> InstanceDescriptor {
    InstanceDescriptor {
        id: instance_id.to_string(),
        instance_type: INSTANCE_TYPE.to_string(),
        availability_zone: "eu-west-1a".to_string(),
        public_ip: Some("34.245.10.20".to_string()),
        state: state.into(),
    }
}
