// src/main.rs

//! # dgen DID API - Main Entry Point
//!
//! Loads settings, connects to zkSync and serves the DID API.
//!
//! ## Configuration
//! Settings come from built-in defaults, an optional `dgen.toml` and `DGEN__*`
//! environment variables (a `.env` file is loaded first). The contract addresses are
//! required, e.g. `DGEN__CONTRACTS__KEY_REGISTRY`. Without `DGEN__WALLET__PRIVATE_KEY`
//! the server only answers reads.

use anyhow::Context;
use dgen_did::blockchain::zksync_client::ZkSyncClient;
use dgen_did::config::Settings;
use dgen_did::contracts::DidRegistry;
use dgen_did::services::api_server::ApiServer;
use dotenv::dotenv;
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let settings = Settings::load().context("failed to load settings")?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.logging.level.as_str()),
    )
    .init();

    let client = ZkSyncClient::new(
        &settings.network.rpc_url,
        settings.wallet.private_key.as_deref(),
    )
    .await
    .context("failed to initialize ZkSyncClient - check network connection and private key")?;
    info!("connected to {}", settings.network.rpc_url);

    let registry = Arc::new(DidRegistry::new(client, settings.contracts));
    let api_server = ApiServer::new(registry, settings.contracts, settings.registration.required());

    let addr = settings.listen_addr()?;
    api_server.run(addr).await.context("API server stopped")?;
    Ok(())
}
