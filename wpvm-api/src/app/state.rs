use std::sync::Arc;

use wpvm_common::constants::TARGET_REGION;
use wpvm_providers::ProviderConnector;

use crate::provisioning::ProvisioningService;
use crate::registry::{ClientRegistry, RegistryMode};

pub struct AppState {
    pub provisioning: ProvisioningService,
}

impl AppState {
    pub fn new(provisioning: ProvisioningService) -> Arc<Self> {
        Arc::new(Self { provisioning })
    }

    /// State wired to `connector`, with a registry scoped to the target region.
    pub fn with_connector(connector: Arc<dyn ProviderConnector>, mode: RegistryMode) -> Arc<Self> {
        let registry = Arc::new(ClientRegistry::new(connector, TARGET_REGION, mode));
        Self::new(ProvisioningService::new(registry))
    }
}
