use std::sync::Arc;

use wpvm_common::constants::TARGET_REGION;
use wpvm_providers::mock::MockEc2;
use wpvm_providers::ProviderConnector;

pub struct ProviderManager;

impl ProviderManager {
    /// Connector for the configured provider backend, `None` for unknown names.
    pub fn get_connector(provider_name: &str) -> Option<Arc<dyn ProviderConnector>> {
        match provider_name.to_lowercase().as_str() {
            #[cfg(feature = "provider-aws")]
            "aws" => Some(Arc::new(wpvm_providers::aws::AwsConnector)),
            "mock" => {
                // Local runs: a fresh account with one default VPC, shared by every session.
                let ec2 = Arc::new(MockEc2::with_default_vpc(TARGET_REGION));
                Some(Arc::new(wpvm_providers::mock::MockConnector::new(ec2)))
            }
            _ => None,
        }
    }

    pub fn available() -> Vec<&'static str> {
        let mut names = Vec::new();
        if cfg!(feature = "provider-aws") {
            names.push("aws");
        }
        names.push("mock");
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_resolve() {
        let mock = ProviderManager::get_connector("MOCK").unwrap();
        assert_eq!(mock.name(), "mock");
        for name in ProviderManager::available() {
            assert!(ProviderManager::get_connector(name).is_some(), "{name}");
        }
    }

    #[test]
    fn unknown_provider_is_none() {
        assert!(ProviderManager::get_connector("scaleway").is_none());
    }
}
