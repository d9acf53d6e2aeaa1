//! JSON-RPC log source.
//!
//! Talks to an Ethereum node over HTTP with four calls:
//! `eth_getLogs`, `eth_getTransactionByHash`, `eth_getBlockByNumber` and
//! `eth_call` (for the ERC-6538 registry).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use ephereum_core::constants::{ERC6538_REGISTRY, STEALTH_META_ADDRESS_OF_FUNCTION};
use ephereum_core::error::{EphereumError, Result};
use ephereum_core::traits::{BlockTag, LogSource, MetaAddressRegistry};
use ephereum_core::types::{Announcement, EthAddress, MetaAddress, TxHash, H256};
use ephereum_crypto::function_selector;

use crate::abi::{decode_bytes_return, decode_envelope_log, encode_call, RawLog, Token};

/// Default Ethereum RPC URL when none is provided.
pub const DEFAULT_ETH_RPC_URL: &str = "https://ethereum.publicnode.com";

/// JSON-RPC client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Ethereum RPC URL
    pub rpc_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_ETH_RPC_URL.into(),
            timeout_seconds: 30,
        }
    }
}

impl RpcConfig {
    /// Creates a new configuration with the given RPC URL.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ..Default::default()
        }
    }

    /// Sets the request timeout.
    pub fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Log as it appears in an `eth_getLogs` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: Option<String>,
    log_index: Option<String>,
    transaction_hash: Option<String>,
}

impl RpcLog {
    fn into_raw(self) -> Result<RawLog> {
        Ok(RawLog {
            address: EthAddress::from_hex(&self.address)?,
            topics: self
                .topics
                .iter()
                .map(|t| H256::from_hex(t))
                .collect::<Result<Vec<_>>>()?,
            data: decode_hex_data(&self.data)?,
            block_number: self.block_number.as_deref().map(parse_quantity).transpose()?,
            log_index: self.log_index.as_deref().map(parse_quantity).transpose()?,
            transaction_hash: self.transaction_hash.as_deref().map(TxHash::from_hex).transpose()?,
        })
    }
}

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(s: &str) -> Result<u64> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| EphereumError::RpcError(format!("quantity without 0x prefix: {}", s)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| EphereumError::RpcError(format!("bad quantity {}: {}", s, e)))
}

fn decode_hex_data(s: &str) -> Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(digits)?)
}

/// [`LogSource`] and [`MetaAddressRegistry`] over a node's JSON-RPC API.
pub struct JsonRpcLogSource {
    config: RpcConfig,
    http_client: reqwest::Client,
    registry_address: EthAddress,
    next_id: AtomicU64,
}

impl JsonRpcLogSource {
    /// Creates a client for `rpc_url` with default settings.
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        Self::with_config(RpcConfig::new(rpc_url))
    }

    /// Creates a client with custom configuration.
    ///
    /// # Errors
    /// `ConfigError` if the HTTP client cannot be built or the built-in
    /// ERC-6538 address fails to parse.
    pub fn with_config(config: RpcConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EphereumError::ConfigError(format!("failed to create HTTP client: {}", e)))?;
        let registry_address = EthAddress::from_hex(ERC6538_REGISTRY)
            .map_err(|e| EphereumError::ConfigError(format!("ERC-6538 address: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            registry_address,
            next_id: AtomicU64::new(1),
        })
    }

    /// Overrides the ERC-6538 registry address, e.g. for a test deployment.
    pub fn with_registry_address(mut self, address: EthAddress) -> Self {
        self.registry_address = address;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Sends one JSON-RPC request and returns its `result`.
    ///
    /// # Errors
    /// - `HttpError` for transport failures and non-JSON bodies
    /// - `RpcError` for a JSON-RPC `error` object
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id
        });

        let response = self
            .http_client
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EphereumError::HttpError(e.to_string()))?;

        let status = response.status();
        let mut body: Value = response
            .json()
            .await
            .map_err(|e| EphereumError::HttpError(format!("{} ({})", e, status)))?;

        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            warn!(method, error = %message, "JSON-RPC error");
            return Err(EphereumError::RpcError(message));
        }

        if !status.is_success() {
            return Err(EphereumError::HttpError(format!("HTTP {}", status)));
        }

        body.get_mut("result")
            .map(Value::take)
            .ok_or_else(|| EphereumError::RpcError(format!("{} returned no result", method)))
    }
}

#[async_trait]
impl LogSource for JsonRpcLogSource {
    #[instrument(skip(self), fields(address = %address))]
    async fn get_logs(
        &self,
        address: &EthAddress,
        event_signature: &H256,
        from_block: u64,
        to_block: BlockTag,
    ) -> Result<Vec<Announcement>> {
        let filter = json!({
            "address": address.to_hex_string(),
            "topics": [event_signature.to_hex()],
            "fromBlock": BlockTag::Number(from_block).to_rpc(),
            "toBlock": to_block.to_rpc(),
        });

        let result = self.call("eth_getLogs", json!([filter])).await?;
        let logs: Vec<RpcLog> = serde_json::from_value(result)
            .map_err(|e| EphereumError::RpcError(format!("unexpected eth_getLogs shape: {}", e)))?;

        let total = logs.len();
        let mut announcements = Vec::with_capacity(total);
        for log in logs {
            match log.into_raw().and_then(|raw| decode_envelope_log(&raw)) {
                Ok(announcement) => announcements.push(announcement),
                Err(e) => warn!(error = %e, "Skipping undecodable log"),
            }
        }

        debug!(from_block, total, decoded = announcements.len(), "Retrieved logs");
        Ok(announcements)
    }

    #[instrument(skip(self))]
    async fn get_transaction_sender(&self, tx_hash: &TxHash) -> Result<EthAddress> {
        let result = self.call("eth_getTransactionByHash", json!([tx_hash.to_hex()])).await?;
        let from = result
            .get("from")
            .and_then(Value::as_str)
            .ok_or_else(|| EphereumError::RpcError(format!("transaction {} not found", tx_hash)))?;

        EthAddress::from_hex(from)
    }

    #[instrument(skip(self))]
    async fn get_block_timestamp(&self, block_number: u64) -> Result<i64> {
        let result = self
            .call("eth_getBlockByNumber", json!([BlockTag::Number(block_number).to_rpc(), false]))
            .await?;
        let timestamp = result
            .get("timestamp")
            .and_then(Value::as_str)
            .ok_or_else(|| EphereumError::RpcError(format!("block {} not found", block_number)))?;

        let seconds = parse_quantity(timestamp)?;
        i64::try_from(seconds)
            .ok()
            .and_then(|s| s.checked_mul(1000))
            .ok_or_else(|| EphereumError::RpcError(format!("timestamp out of range: {}", timestamp)))
    }
}

#[async_trait]
impl MetaAddressRegistry for JsonRpcLogSource {
    #[instrument(skip(self))]
    async fn stealth_meta_address_of(
        &self,
        registrant: &EthAddress,
        scheme_id: u64,
    ) -> Result<Option<MetaAddress>> {
        let data = encode_call(
            function_selector(STEALTH_META_ADDRESS_OF_FUNCTION),
            &[Token::Address(*registrant), Token::Uint(scheme_id)],
        );
        let call = json!({
            "to": self.registry_address.to_hex_string(),
            "data": format!("0x{}", hex::encode(data)),
        });

        let result = self.call("eth_call", json!([call, "latest"])).await?;
        let returned = decode_hex_data(result.as_str().unwrap_or("0x"))?;
        let bytes = decode_bytes_return(&returned)?;

        if bytes.is_empty() {
            debug!("No meta-address registered");
            return Ok(None);
        }

        MetaAddress::decode(&bytes).map(Some)
    }
}
