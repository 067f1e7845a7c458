use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use wpvm_api::config::AppConfig;
use wpvm_api::provider_manager::ProviderManager;
use wpvm_api::{build_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let connector = ProviderManager::get_connector(&config.provider).with_context(|| {
        format!(
            "unknown PROVIDER '{}' (available: {})",
            config.provider,
            ProviderManager::available().join(", ")
        )
    })?;

    tracing::info!(
        provider = %config.provider,
        registry_mode = config.registry_mode.as_str(),
        "starting wpvm-api"
    );

    let state = AppState::with_connector(connector, config.registry_mode);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Backend listening on {}", config.bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
