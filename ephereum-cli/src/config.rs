//! CLI configuration: environment (and `.env`) first, flags on top.

use std::path::PathBuf;

use anyhow::{Context, Result};

use ephereum_core::constants::MESSAGE_ENVELOPE_REGISTRY;
use ephereum_core::types::EthAddress;
use ephereum_registry::{RpcConfig, DEFAULT_ETH_RPC_URL};
use ephereum_scanner::ScannerConfig;

const DEFAULT_RPC_TIMEOUT_SECONDS: u64 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliConfig {
    pub rpc_url: String,
    pub registry_address: String,
    pub blob_dir: Option<PathBuf>,
    pub rpc_timeout_seconds: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_ETH_RPC_URL.into(),
            registry_address: MESSAGE_ENVELOPE_REGISTRY.into(),
            blob_dir: None,
            rpc_timeout_seconds: DEFAULT_RPC_TIMEOUT_SECONDS,
        }
    }
}

impl CliConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            rpc_url: std::env::var("ETH_RPC_URL").unwrap_or(defaults.rpc_url),
            registry_address: std::env::var("EPHEREUM_REGISTRY_ADDRESS").unwrap_or(defaults.registry_address),
            blob_dir: std::env::var("EPHEREUM_BLOB_DIR").ok().map(PathBuf::from),
            rpc_timeout_seconds: std::env::var("RPC_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rpc_timeout_seconds),
        }
    }

    /// Applies command-line flags that were given.
    pub fn with_overrides(mut self, rpc_url: Option<String>, registry: Option<String>, timeout: Option<u64>) -> Self {
        if let Some(url) = rpc_url {
            self.rpc_url = url;
        }
        if let Some(address) = registry {
            self.registry_address = address;
        }
        if let Some(seconds) = timeout {
            self.rpc_timeout_seconds = seconds;
        }
        self
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig::new(&self.rpc_url).timeout_seconds(self.rpc_timeout_seconds)
    }

    pub fn scanner_config(&self) -> Result<ScannerConfig> {
        let address = EthAddress::from_hex(&self.registry_address)
            .with_context(|| format!("Invalid registry address: {}", self.registry_address))?;
        Ok(ScannerConfig::new().registry_address(address))
    }
}
