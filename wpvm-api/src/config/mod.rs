use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

use crate::registry::RegistryMode;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_PROVIDER: &str = "aws";

/// Process configuration, read from the environment (and `.env` when present).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Provider backend: "aws" or "mock".
    pub provider: String,
    pub registry_mode: RegistryMode,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = var("WPVM_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("WPVM_BIND_ADDR is not a socket address: {}", bind_addr))?;

        let provider = var("PROVIDER")
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
            .to_lowercase();

        let registry_mode = match var("CLIENT_REGISTRY_MODE") {
            Some(raw) => RegistryMode::parse(&raw).with_context(|| {
                format!(
                    "CLIENT_REGISTRY_MODE must be 'singleton' or 'per-credential', got '{}'",
                    raw
                )
            })?,
            None => RegistryMode::Singleton,
        };

        Ok(Self {
            bind_addr,
            provider,
            registry_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.provider, "aws");
        assert_eq!(config.registry_mode, RegistryMode::Singleton);
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("WPVM_BIND_ADDR", "127.0.0.1:9090"),
            ("PROVIDER", " Mock "),
            ("CLIENT_REGISTRY_MODE", "per-credential"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9090);
        assert_eq!(config.provider, "mock");
        assert_eq!(config.registry_mode, RegistryMode::PerCredential);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("PROVIDER", "  "), ("CLIENT_REGISTRY_MODE", "")]).unwrap();
        assert_eq!(config.provider, "aws");
        assert_eq!(config.registry_mode, RegistryMode::Singleton);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = config_from(&[("WPVM_BIND_ADDR", "nowhere")]).unwrap_err();
        assert!(err.to_string().contains("WPVM_BIND_ADDR"));

        let err = config_from(&[("CLIENT_REGISTRY_MODE", "sharded")]).unwrap_err();
        assert!(err.to_string().contains("sharded"));
    }
}
