// src/config.rs
//! Layered application settings.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults (zkSync Sepolia RPC, allowance of 100, localhost:3000)
//! 2. Optional `dgen.toml` in the working directory
//! 3. Environment variables prefixed `DGEN__`, e.g. `DGEN__CONTRACTS__KEY_REGISTRY`

use crate::error::{DidError, Result};
use config::{Config, Environment, File};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::net::SocketAddr;

/// Full settings tree.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub network: NetworkSettings,
    pub contracts: ContractAddresses,
    #[serde(default)]
    pub wallet: WalletSettings,
    pub registration: RegistrationSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSettings {
    pub rpc_url: String,
}

/// Deployed registry and token addresses.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ContractAddresses {
    pub key_registry: Address,
    pub name_registry: Address,
    pub service_account_registry: Address,
    pub account_link_registry: Address,
    pub token: Address,
    pub faucet: Address,
}

impl ContractAddresses {
    /// Registries that pull payment tokens and may therefore be approved as spenders.
    pub fn spenders(&self) -> [Address; 4] {
        [
            self.key_registry,
            self.name_registry,
            self.service_account_registry,
            self.account_link_registry,
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletSettings {
    /// Hex private key; the server is read-only when absent
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationSettings {
    /// Token amount each registry pulls per write, in base units
    pub required_allowance: u64,
}

impl RegistrationSettings {
    pub fn required(&self) -> U256 {
        U256::from(self.required_allowance)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    /// Loads settings from defaults, `dgen.toml` and `DGEN__*` environment variables.
    ///
    /// # Errors
    /// Returns [`DidError::Config`] when a source is malformed or a contract address is
    /// missing.
    pub fn load() -> Result<Self> {
        Self::build(File::with_name("dgen").required(false))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .set_default("network.rpc_url", "https://sepolia.era.zksync.dev")?
            .set_default("registration.required_allowance", 100_i64)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000_i64)?
            .set_default("logging.level", "info")?
            .add_source(file)
            .add_source(
                Environment::with_prefix("DGEN")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize().map_err(DidError::from)
    }

    /// Socket address the API server binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| DidError::Config(format!("invalid listen address: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACTS: &str = r#"
        [contracts]
        key_registry = "0x1111111111111111111111111111111111111111"
        name_registry = "0x2222222222222222222222222222222222222222"
        service_account_registry = "0x3333333333333333333333333333333333333333"
        account_link_registry = "0x4444444444444444444444444444444444444444"
        token = "0x5555555555555555555555555555555555555555"
        faucet = "0x6666666666666666666666666666666666666666"
    "#;

    fn from_toml(toml: &str) -> Result<Settings> {
        Settings::build(File::from_str(toml, config::FileFormat::Toml))
    }

    #[test]
    fn defaults_fill_everything_but_contracts() {
        let settings = from_toml(CONTRACTS).unwrap();
        assert_eq!(settings.network.rpc_url, "https://sepolia.era.zksync.dev");
        assert_eq!(settings.registration.required(), U256::from(100));
        assert_eq!(settings.listen_addr().unwrap().port(), 3000);
        assert!(settings.wallet.private_key.is_none());
        assert_eq!(
            settings.contracts.spenders()[0],
            "0x1111111111111111111111111111111111111111".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let toml = format!(
            "{CONTRACTS}\n[registration]\nrequired_allowance = 250\n[server]\nhost = \"0.0.0.0\"\nport = 8080\n"
        );
        let settings = from_toml(&toml).unwrap();
        assert_eq!(settings.registration.required(), U256::from(250));
        assert_eq!(settings.listen_addr().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn missing_contracts_is_a_config_error() {
        let err = from_toml("[network]\nrpc_url = \"http://localhost:8011\"\n").unwrap_err();
        assert!(matches!(err, DidError::Config(_)));
    }
}
