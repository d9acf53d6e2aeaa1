//! Announcement metadata: `{"version":"v1","payloadHash":"0x…"}` as UTF-8
//! JSON bytes.
//!
//! Metadata is advisory. Other protocol versions share the same event, so
//! decoding never fails: anything unrecognized is simply `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ephereum_core::constants::METADATA_VERSION;
use ephereum_core::error::{EphereumError, Result};
use ephereum_core::types::PayloadHash;

/// Decoded announcement metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementMetadata {
    /// Format version, `"v1"`
    pub version: String,
    /// `0x` + 64 hex chars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_hash: Option<String>,
}

impl AnnouncementMetadata {
    /// Current-version metadata carrying `payload_hash`.
    pub fn v1(payload_hash: Option<&PayloadHash>) -> Self {
        Self {
            version: METADATA_VERSION.to_string(),
            payload_hash: payload_hash.map(PayloadHash::to_hex),
        }
    }

    /// Encodes to JSON bytes.
    ///
    /// # Errors
    /// `InvalidInput` for an unknown version or a payload hash that is not
    /// 32 bytes of hex.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.version != METADATA_VERSION {
            return Err(EphereumError::InvalidInput(format!(
                "unsupported metadata version: {}",
                self.version
            )));
        }
        if let Some(hash) = &self.payload_hash {
            if !is_payload_hash(hash) {
                return Err(EphereumError::InvalidInput(
                    "payloadHash must be a 32-byte hex string".into(),
                ));
            }
        }

        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes metadata bytes, or `None` for empty, foreign or malformed
    /// input.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }

        let parsed: Value = serde_json::from_slice(bytes).ok()?;
        if parsed.get("version").and_then(Value::as_str) != Some(METADATA_VERSION) {
            return None;
        }

        let payload_hash = match parsed.get("payloadHash") {
            None => None,
            Some(Value::String(hash)) if is_payload_hash(hash) => Some(hash.clone()),
            Some(_) => return None,
        };

        Some(Self {
            version: METADATA_VERSION.to_string(),
            payload_hash,
        })
    }

    /// The payload hash, parsed.
    pub fn payload_hash(&self) -> Option<PayloadHash> {
        self.payload_hash
            .as_deref()
            .and_then(|hash| PayloadHash::from_hex(hash).ok())
    }
}

/// `^0x[0-9a-fA-F]{64}$`
pub fn is_payload_hash(value: &str) -> bool {
    match value.strip_prefix("0x") {
        Some(body) => body.len() == 64 && body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
