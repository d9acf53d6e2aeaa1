//! ABI codec for the message-envelope registry.
//!
//! ```text
//! event    MessageEnvelope(address indexed recipientStealthAddress,
//!                          bytes ephemeralPubKey, bytes1 viewTag, bytes metadata)
//! function announce(address recipientStealthAddress, bytes ephemeralPubKey,
//!                   bytes1 viewTag, bytes metadata)
//! ```
//!
//! Only the handful of static and dynamic types these two signatures use are
//! supported: `address`, `uint256` (u64 range), `bytes1` and `bytes`.

use ephereum_core::constants::{ANNOUNCE_FUNCTION, MESSAGE_ENVELOPE_EVENT};
use ephereum_core::error::{EphereumError, Result};
use ephereum_core::types::{Announcement, EthAddress, TxHash, H256};
use ephereum_crypto::{event_topic, function_selector};

const WORD: usize = 32;

/// One ABI argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    /// `address`, left-padded to 32 bytes
    Address(EthAddress),
    /// `uint256` restricted to the u64 range
    Uint(u64),
    /// `bytes1`, right-padded to 32 bytes
    FixedBytes1(u8),
    /// `bytes`, encoded in the tail
    Bytes(&'a [u8]),
}

impl Token<'_> {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::Bytes(_))
    }
}

/// Raw log as returned by a node, before decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract
    pub address: EthAddress,
    /// topic0 and indexed arguments
    pub topics: Vec<H256>,
    /// ABI-encoded non-indexed arguments
    pub data: Vec<u8>,
    /// `None` for pending logs
    pub block_number: Option<u64>,
    /// `None` for pending logs
    pub log_index: Option<u64>,
    /// `None` for pending logs
    pub transaction_hash: Option<TxHash>,
}

/// Non-indexed fields of a `MessageEnvelope` event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvelopeData {
    /// Sender's ephemeral public key bytes
    pub ephemeral_pub_key: Vec<u8>,
    /// View tag
    pub view_tag: u8,
    /// Metadata bytes
    pub metadata: Vec<u8>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// topic0 of `MessageEnvelope(address,bytes,bytes1,bytes)`.
pub fn message_envelope_topic() -> H256 {
    event_topic(MESSAGE_ENVELOPE_EVENT)
}

/// Selector of `announce(address,bytes,bytes1,bytes)`.
pub fn announce_selector() -> [u8; 4] {
    function_selector(ANNOUNCE_FUNCTION)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODING
// ═══════════════════════════════════════════════════════════════════════════════

/// Head/tail encodes a parameter list.
pub fn encode_params(tokens: &[Token<'_>]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Address(address) => {
                let mut word = [0u8; WORD];
                word[WORD - address.as_bytes().len()..].copy_from_slice(address.as_bytes());
                head.extend_from_slice(&word);
            }
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::FixedBytes1(byte) => {
                let mut word = [0u8; WORD];
                word[0] = *byte;
                head.extend_from_slice(&word);
            }
            Token::Bytes(data) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(data.len() as u64));
                tail.extend_from_slice(data);
                tail.resize(tail.len() + padding(data.len()), 0);
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Encodes a call: selector followed by the parameters.
pub fn encode_call(selector: [u8; 4], tokens: &[Token<'_>]) -> Vec<u8> {
    let mut out = selector.to_vec();
    out.extend_from_slice(&encode_params(tokens));
    out
}

/// Calldata for `announce(stealth, ephemeralPubKey, viewTag, metadata)`.
pub fn encode_announce_calldata(
    stealth_address: &EthAddress,
    ephemeral_pub_key: &[u8],
    view_tag: u8,
    metadata: &[u8],
) -> Vec<u8> {
    encode_call(
        announce_selector(),
        &[
            Token::Address(*stealth_address),
            Token::Bytes(ephemeral_pub_key),
            Token::FixedBytes1(view_tag),
            Token::Bytes(metadata),
        ],
    )
}

/// Event data for `(ephemeralPubKey, viewTag, metadata)`.
pub fn encode_envelope_data(ephemeral_pub_key: &[u8], view_tag: u8, metadata: &[u8]) -> Vec<u8> {
    encode_params(&[
        Token::Bytes(ephemeral_pub_key),
        Token::FixedBytes1(view_tag),
        Token::Bytes(metadata),
    ])
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn padding(len: usize) -> usize {
    (WORD - len % WORD) % WORD
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECODING
// ═══════════════════════════════════════════════════════════════════════════════

fn word_at(data: &[u8], offset: usize) -> Result<&[u8]> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| EphereumError::InvalidAbi(format!("word at {} out of bounds", offset)))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize> {
    let word = word_at(data, offset)?;
    if word[..WORD - 8].iter().any(|&b| b != 0) {
        return Err(EphereumError::InvalidAbi("integer does not fit in 64 bits".into()));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(bytes))
        .map_err(|_| EphereumError::InvalidAbi("integer does not fit in usize".into()))
}

/// Reads a dynamic `bytes` whose offset word sits at `head_offset`.
pub fn read_bytes(data: &[u8], head_offset: usize) -> Result<Vec<u8>> {
    let start = read_usize(data, head_offset)?;
    let len = read_usize(data, start)?;
    let body = start
        .checked_add(WORD)
        .ok_or_else(|| EphereumError::InvalidAbi("offset overflow".into()))?;
    let end = body
        .checked_add(len)
        .ok_or_else(|| EphereumError::InvalidAbi("length overflow".into()))?;

    data.get(body..end)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| EphereumError::InvalidAbi(format!("bytes [{}..{}] out of bounds", body, end)))
}

/// Decodes a function's single `bytes` return value.
///
/// An empty return (no contract or nothing registered) yields an empty vector.
pub fn decode_bytes_return(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    read_bytes(data, 0)
}

/// Decodes `MessageEnvelope` event data.
pub fn decode_envelope_data(data: &[u8]) -> Result<EnvelopeData> {
    let ephemeral_pub_key = read_bytes(data, 0)?;
    let view_tag = word_at(data, WORD)?[0];
    let metadata = read_bytes(data, 2 * WORD)?;

    Ok(EnvelopeData {
        ephemeral_pub_key,
        view_tag,
        metadata,
    })
}

/// Decodes a raw `MessageEnvelope` log into an [`Announcement`].
///
/// # Errors
/// `InvalidAbi` for foreign events, pending logs, or malformed data.
pub fn decode_envelope_log(log: &RawLog) -> Result<Announcement> {
    let topic0 = log
        .topics
        .first()
        .ok_or_else(|| EphereumError::InvalidAbi("log has no topics".into()))?;
    if *topic0 != message_envelope_topic() {
        return Err(EphereumError::InvalidAbi("not a MessageEnvelope event".into()));
    }

    let recipient_topic = log
        .topics
        .get(1)
        .ok_or_else(|| EphereumError::InvalidAbi("missing indexed recipient".into()))?;
    let recipient_stealth_address = EthAddress::from_bytes(&recipient_topic.as_bytes()[12..])?;

    let (block_number, log_index, transaction_hash) =
        match (log.block_number, log.log_index, log.transaction_hash) {
            (Some(block), Some(index), Some(tx)) => (block, index, tx),
            _ => return Err(EphereumError::InvalidAbi("pending log".into())),
        };

    let envelope = decode_envelope_data(&log.data)?;

    Ok(Announcement::builder(recipient_stealth_address, envelope.ephemeral_pub_key, envelope.view_tag)
        .metadata(envelope.metadata)
        .block_number(block_number)
        .log_index(log_index)
        .transaction_hash(transaction_hash)
        .build())
}

/// Builds the raw log a registry would emit for `announcement`.
pub fn encode_envelope_log(registry: EthAddress, announcement: &Announcement) -> RawLog {
    let mut recipient_topic = [0u8; 32];
    recipient_topic[12..].copy_from_slice(announcement.recipient_stealth_address.as_bytes());

    RawLog {
        address: registry,
        topics: vec![message_envelope_topic(), H256::from_array(recipient_topic)],
        data: encode_envelope_data(
            &announcement.ephemeral_pub_key,
            announcement.view_tag,
            &announcement.metadata,
        ),
        block_number: Some(announcement.block_number),
        log_index: Some(announcement.log_index),
        transaction_hash: Some(announcement.transaction_hash),
    }
}
