use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use wpvm_common::Credentials;
use wpvm_providers::{CredentialedClient, ProviderConnector};

/// How the registry keys its cached clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryMode {
    /// One client for the whole process: the first caller's session serves
    /// every later request, whatever credentials it carries.
    Singleton,
    /// One client per credential pair.
    PerCredential,
}

impl RegistryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryMode::Singleton => "singleton",
            RegistryMode::PerCredential => "per-credential",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singleton" => Some(RegistryMode::Singleton),
            "per-credential" | "per_credential" => Some(RegistryMode::PerCredential),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum RegistryKey {
    Process,
    Pair(Credentials),
}

type ClientCell = Arc<OnceCell<Arc<CredentialedClient>>>;

/// Process-wide cache of credentialed clients.
///
/// Each key owns a `OnceCell`: the map lock only guards finding the cell, and
/// construction runs inside the cell, so a key is built at most once while
/// lookups for other keys proceed.
pub struct ClientRegistry {
    connector: Arc<dyn ProviderConnector>,
    region: String,
    mode: RegistryMode,
    clients: Mutex<HashMap<RegistryKey, ClientCell>>,
}

impl ClientRegistry {
    pub fn new(
        connector: Arc<dyn ProviderConnector>,
        region: impl Into<String>,
        mode: RegistryMode,
    ) -> Self {
        Self {
            connector,
            region: region.into(),
            mode,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> RegistryMode {
        self.mode
    }

    fn key_for(&self, credentials: &Credentials) -> RegistryKey {
        match self.mode {
            RegistryMode::Singleton => RegistryKey::Process,
            RegistryMode::PerCredential => RegistryKey::Pair(credentials.clone()),
        }
    }

    async fn cell_for(&self, key: &RegistryKey) -> ClientCell {
        let mut clients = self.clients.lock().await;
        clients.entry(key.clone()).or_default().clone()
    }

    /// Cached client for `credentials`, built on first use.
    ///
    /// Construction failures are logged and yield `None`; nothing is cached
    /// for them, so the next call tries again.
    pub async fn get_or_create(&self, credentials: &Credentials) -> Option<Arc<CredentialedClient>> {
        let key = self.key_for(credentials);
        let cell = self.cell_for(&key).await;

        let built = cell
            .get_or_try_init(|| async {
                CredentialedClient::connect(self.connector.as_ref(), credentials, &self.region)
                    .await
                    .map(Arc::new)
            })
            .await;

        match built {
            Ok(client) => Some(client.clone()),
            Err(e) => {
                tracing::warn!("There has been an error creating a AWS client, {:#}", e);
                let mut clients = self.clients.lock().await;
                if clients
                    .get(&key)
                    .is_some_and(|current| Arc::ptr_eq(current, &cell) && !cell.initialized())
                {
                    clients.remove(&key);
                }
                None
            }
        }
    }

    /// Drops every cached client; the next request builds a fresh session.
    pub async fn clear(&self) {
        self.clients.lock().await.clear();
    }

    /// Number of clients built and cached.
    pub async fn len(&self) -> usize {
        self.clients
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use wpvm_providers::mock::{MockConnector, MockEc2};

    fn connector() -> Arc<MockConnector> {
        Arc::new(MockConnector::new(Arc::new(MockEc2::with_default_vpc("eu-west-1"))))
    }

    #[test]
    fn mode_parse_roundtrip() {
        for mode in [RegistryMode::Singleton, RegistryMode::PerCredential] {
            assert_eq!(RegistryMode::parse(mode.as_str()), Some(mode));
            assert_eq!(RegistryMode::parse(&mode.as_str().to_uppercase()), Some(mode));
        }
        assert_eq!(RegistryMode::parse("per_credential"), Some(RegistryMode::PerCredential));
        assert_eq!(RegistryMode::parse("sharded"), None);
    }

    #[tokio::test]
    async fn singleton_ignores_credentials_after_first_build() {
        let connector = connector();
        let registry = ClientRegistry::new(connector.clone(), "eu-west-1", RegistryMode::Singleton);

        let first = registry
            .get_or_create(&Credentials::new("AKIAFIRST", "one"))
            .await
            .unwrap();
        let second = registry
            .get_or_create(&Credentials::new("AKIASECOND", "two"))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.access_key_id(), "AKIAFIRST");
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn per_credential_builds_one_client_per_pair() {
        let connector = connector();
        let registry =
            ClientRegistry::new(connector.clone(), "eu-west-1", RegistryMode::PerCredential);
        let alice = Credentials::new("AKIAALICE", "a");
        let bob = Credentials::new("AKIABOB", "b");

        let a1 = registry.get_or_create(&alice).await.unwrap();
        let b1 = registry.get_or_create(&bob).await.unwrap();
        let a2 = registry.get_or_create(&alice).await.unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b1));
        assert_eq!(b1.access_key_id(), "AKIABOB");
        assert_eq!(connector.connects(), 2);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn construction_failure_yields_none_and_caches_nothing() {
        let connector = Arc::new(MockConnector::refusing(Arc::new(MockEc2::new("eu-west-1"))));
        let registry = ClientRegistry::new(connector, "eu-west-1", RegistryMode::Singleton);

        assert!(registry.get_or_create(&Credentials::new("AKIA", "s")).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_first_requests_build_once() {
        let connector = connector();
        let registry = Arc::new(ClientRegistry::new(
            connector.clone(),
            "eu-west-1",
            RegistryMode::Singleton,
        ));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .get_or_create(&Credentials::new(format!("AKIA{i}"), "s"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn clear_drops_cached_clients() {
        let connector = connector();
        let registry = ClientRegistry::new(connector.clone(), "eu-west-1", RegistryMode::Singleton);
        let creds = Credentials::new("AKIA", "s");

        registry.get_or_create(&creds).await.unwrap();
        registry.clear().await;
        assert!(registry.is_empty().await);
        registry.get_or_create(&creds).await.unwrap();

        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn slow_build_does_not_block_other_keys() {
        let connector = connector();
        connector.delay_connect("AKIASLOW", Duration::from_secs(2));
        let registry = Arc::new(ClientRegistry::new(
            connector.clone(),
            "eu-west-1",
            RegistryMode::PerCredential,
        ));
        let fast = Credentials::new("AKIAFAST", "f");
        registry.get_or_create(&fast).await.unwrap();

        let slow = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .get_or_create(&Credentials::new("AKIASLOW", "s"))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        assert!(registry.get_or_create(&fast).await.is_some());
        assert!(registry.get_or_create(&Credentials::new("AKIANEW", "n")).await.is_some());
        assert!(started.elapsed() < Duration::from_millis(500));

        assert!(slow.await.unwrap().is_some());
        assert_eq!(connector.connects(), 3);
    }

    #[tokio::test]
    async fn concurrent_requests_for_one_key_build_once() {
        let connector = connector();
        connector.delay_connect("AKIASHARED", Duration::from_millis(100));
        let registry = Arc::new(ClientRegistry::new(
            connector.clone(),
            "eu-west-1",
            RegistryMode::PerCredential,
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .get_or_create(&Credentials::new("AKIASHARED", "s"))
                        .await
                })
            })
            .collect();
        let clients: Vec<_> = join_clients(handles).await;

        assert!(clients.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(connector.connects(), 1);
        assert_eq!(registry.len().await, 1);
    }

    async fn join_clients(
        handles: Vec<tokio::task::JoinHandle<Option<Arc<CredentialedClient>>>>,
    ) -> Vec<Arc<CredentialedClient>> {
        let mut clients = Vec::new();
        for handle in handles {
            clients.push(handle.await.unwrap().unwrap());
        }
        clients
    }
}
