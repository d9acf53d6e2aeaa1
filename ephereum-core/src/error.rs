//! Error types for Ephereum.
//!
//! One `thiserror` enum covers the whole workspace. Variants fall into three
//! families that callers treat differently:
//!
//! - **Protocol**: caller or input mistakes, reported immediately, never retried
//! - **Crypto**: authentication failures and "not for this recipient" results
//! - **Transient**: unavailable blobs and failed log queries, retried next cycle

use thiserror::Error;

/// Result type alias using `EphereumError`.
pub type Result<T> = std::result::Result<T, EphereumError>;

/// Coarse classification of an [`EphereumError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, unsupported scheme, bad lengths.
    Protocol,
    /// Authentication failure or recipient mismatch.
    Crypto,
    /// Network, RPC or blob availability problems.
    Transient,
    /// Serialization, configuration and internal errors.
    Other,
}

/// Main error type for all Ephereum operations.
#[derive(Debug, Error)]
pub enum EphereumError {
    // ═══════════════════════════════════════════════════════════════════════════
    // PROTOCOL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Meta-address scheme other than the supported one.
    #[error("Unsupported stealth scheme: 0x{0:02x}")]
    UnsupportedScheme(u8),

    /// Fixed-width field with the wrong length.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length in bytes
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Input validation failed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encrypted frame or message payload could not be parsed.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Key bytes are not a valid scalar or curve point.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// ABI-encoded calldata or log data could not be decoded.
    #[error("Invalid ABI data: {0}")]
    InvalidAbi(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CRYPTOGRAPHIC ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// AEAD tag check failed (wrong key, corrupted data, or tampering).
    #[error("Authentication failure")]
    AuthenticationFailure,

    /// The announcement was not addressed to these keys.
    #[error("Announcement is not for this recipient")]
    NotForRecipient,

    /// HKDF expansion or scalar derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSIENT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A collaborator is temporarily unable to serve the request.
    #[error("Temporarily unavailable: {0}")]
    TransientUnavailable(String),

    /// JSON-RPC call returned an error object.
    #[error("RPC call failed: {0}")]
    RpcError(String),

    /// HTTP transport failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION & INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl EphereumError {
    /// Returns the error family.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EphereumError::UnsupportedScheme(_)
            | EphereumError::InvalidLength { .. }
            | EphereumError::InvalidInput(_)
            | EphereumError::MalformedFrame(_)
            | EphereumError::InvalidKey(_)
            | EphereumError::InvalidAbi(_) => ErrorKind::Protocol,
            EphereumError::AuthenticationFailure
            | EphereumError::NotForRecipient
            | EphereumError::KeyDerivationError(_) => ErrorKind::Crypto,
            EphereumError::TransientUnavailable(_)
            | EphereumError::RpcError(_)
            | EphereumError::HttpError(_) => ErrorKind::Transient,
            EphereumError::JsonError(_)
            | EphereumError::HexError(_)
            | EphereumError::ConfigError(_)
            | EphereumError::InternalError(_) => ErrorKind::Other,
        }
    }

    /// Returns true if this error is recoverable (retry on the next cycle).
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Returns true if this is a cryptographic error.
    pub fn is_crypto_error(&self) -> bool {
        self.kind() == ErrorKind::Crypto
    }

    /// Returns true if this is a protocol (input) error.
    pub fn is_protocol_error(&self) -> bool {
        self.kind() == ErrorKind::Protocol
    }
}
