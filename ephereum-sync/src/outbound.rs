//! Outbound history.
//!
//! Only the recipient can decrypt a message, so the sender's own history is
//! rebuilt from the envelope logs its accounts sent: one opaque entry per
//! announcement, identified the same way inbound messages are.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use ephereum_core::constants::{ENCRYPTED_THREAD_ID, ENCRYPTED_THREAD_PREFIX, OUTBOUND_CONTENT};
use ephereum_core::error::Result;
use ephereum_core::traits::LogSource;
use ephereum_core::types::{message_id, now_millis, ChatMessage, Direction, EthAddress};
use ephereum_payload::AnnouncementMetadata;
use ephereum_scanner::ScannerConfig;

use crate::lookup::{lookup_senders, lookup_timestamps};

/// Messages sent by the local accounts.
#[derive(Clone, Debug, Default)]
pub struct SentHistory {
    /// Outbound messages, display order
    pub messages: Vec<ChatMessage>,
    /// Highest block among all returned logs, sent by us or not
    pub latest_block: Option<u64>,
}

/// Lists envelope announcements from `from_block` whose transaction was sent
/// by one of `accounts`.
///
/// # Errors
/// Only a failure of the log query. Failed sender lookups just exclude
/// their logs.
#[instrument(skip(source, config, accounts), fields(accounts = accounts.len()))]
pub async fn sent_messages(
    source: &dyn LogSource,
    config: &ScannerConfig,
    accounts: &[EthAddress],
    from_block: u64,
) -> Result<SentHistory> {
    let logs = source
        .get_logs(&config.registry_address, &config.event_signature, from_block, config.to_block)
        .await?;
    let latest_block = logs.iter().map(|log| log.block_number).max();

    let accounts: HashSet<&EthAddress> = accounts.iter().collect();
    let senders = lookup_senders(source, logs.iter().map(|log| log.transaction_hash)).await;

    let ours: Vec<_> = logs
        .iter()
        .filter_map(|log| {
            let sender = senders.get(&log.transaction_hash)?;
            accounts.contains(sender).then_some((log, *sender))
        })
        .collect();

    let timestamps = lookup_timestamps(source, ours.iter().map(|(log, _)| log.block_number)).await;
    let now = now_millis();

    let mut by_id: HashMap<String, ChatMessage> = HashMap::new();
    for (log, sender) in ours {
        let payload_hash = AnnouncementMetadata::decode(&log.metadata).and_then(|m| m.payload_hash());
        let id = message_id(payload_hash.as_ref(), &log.transaction_hash, log.log_index);
        let thread_id = match &payload_hash {
            Some(hash) => format!("{}{}", ENCRYPTED_THREAD_PREFIX, hash.to_hex()),
            None => ENCRYPTED_THREAD_ID.to_string(),
        };

        by_id.insert(
            id.clone(),
            ChatMessage {
                id,
                thread_id,
                content: OUTBOUND_CONTENT.to_string(),
                created_at: timestamps.get(&log.block_number).copied().unwrap_or(now),
                direction: Direction::Outbound,
                transaction_hash: log.transaction_hash,
                sender: Some(sender),
                recipient: Some(log.recipient_stealth_address),
                content_available: false,
                payload_hash,
                block_number: Some(log.block_number),
                log_index: Some(log.log_index),
            },
        );
    }

    let mut messages: Vec<ChatMessage> = by_id.into_values().collect();
    messages.sort_by(ChatMessage::display_order);

    debug!(sent = messages.len(), ?latest_block, "Outbound history loaded");

    Ok(SentHistory { messages, latest_block })
}
