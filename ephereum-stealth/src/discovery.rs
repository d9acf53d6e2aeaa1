//! Stealth key recovery (recipient side).
//!
//! Matching is two-stage. The view tag rejects ~255/256 foreign
//! announcements after one ECDH and one hash. Survivors have their stealth
//! key recovered and the resulting address compared with the announced one,
//! which is the authoritative check since tags collide.

use ephereum_core::error::{EphereumError, Result};
use ephereum_core::types::{Announcement, CompressedPoint, EthAddress, PrivateKey};
use ephereum_crypto::derive::{derive_stealth_private_key, eth_address_of_private_key};
use ephereum_crypto::{ecdh, verify_view_tag};

use crate::wallet::RecipientKeys;

/// A stealth address and the key that controls it.
#[derive(Clone, Debug)]
pub struct RecoveredStealth {
    /// Address derived from the recovered key
    pub stealth_address: EthAddress,
    /// `(spend_priv + tweak) mod n` (zeroized on drop)
    pub stealth_priv_key: PrivateKey,
}

/// Recovers the stealth private key for an announcement.
///
/// # Errors
/// - `NotForRecipient` if the view tag disagrees. This is the routine
///   outcome for foreign announcements, not a fault.
/// - `InvalidKey` if the ephemeral key is not on the curve.
pub fn recover_stealth_priv_key(
    view_priv: &PrivateKey,
    spend_priv: &PrivateKey,
    ephem_pub: &CompressedPoint,
    view_tag: u8,
) -> Result<RecoveredStealth> {
    let shared = ecdh(view_priv, ephem_pub)?;

    if !verify_view_tag(shared.as_bytes(), view_tag) {
        return Err(EphereumError::NotForRecipient);
    }

    let stealth_priv_key = derive_stealth_private_key(spend_priv, shared.as_bytes(), view_tag)?;
    let stealth_address = eth_address_of_private_key(&stealth_priv_key)?;

    Ok(RecoveredStealth {
        stealth_address,
        stealth_priv_key,
    })
}

/// Result of checking a single announcement.
#[derive(Debug)]
pub enum ScanResult {
    /// View tag didn't match - not for this recipient
    TagMismatch,
    /// View tag matched but the recovered address differs (tag collision)
    AddressMismatch {
        /// Address the recovered key controls
        recovered: EthAddress,
    },
    /// Address verified - the announcement is ours
    Matched(RecoveredStealth),
    /// The announcement could not be processed (malformed ephemeral key)
    Invalid(EphereumError),
}

impl ScanResult {
    /// Returns true if the announcement was verified as ours.
    pub fn is_match(&self) -> bool {
        matches!(self, ScanResult::Matched(_))
    }

    /// Returns the recovered key if present.
    pub fn into_recovered(self) -> Option<RecoveredStealth> {
        match self {
            ScanResult::Matched(found) => Some(found),
            _ => None,
        }
    }

    /// Short reason for diagnostics.
    pub fn reason(&self) -> String {
        match self {
            ScanResult::TagMismatch => "view tag mismatch".to_string(),
            ScanResult::AddressMismatch { recovered } => {
                format!("address mismatch (recovered {})", recovered)
            }
            ScanResult::Matched(_) => "matched".to_string(),
            ScanResult::Invalid(e) => format!("invalid announcement: {}", e),
        }
    }
}

/// Runs both matching stages against one announcement.
pub fn check_announcement(announcement: &Announcement, keys: &RecipientKeys) -> ScanResult {
    let ephem_pub = match CompressedPoint::from_bytes(&announcement.ephemeral_pub_key) {
        Ok(point) => point,
        Err(e) => return ScanResult::Invalid(e),
    };

    let recovered = match recover_stealth_priv_key(
        &keys.view().private_key,
        &keys.spend().private_key,
        &ephem_pub,
        announcement.view_tag,
    ) {
        Ok(found) => found,
        Err(EphereumError::NotForRecipient) => return ScanResult::TagMismatch,
        Err(e) => return ScanResult::Invalid(e),
    };

    if recovered.stealth_address != announcement.recipient_stealth_address {
        return ScanResult::AddressMismatch {
            recovered: recovered.stealth_address,
        };
    }

    ScanResult::Matched(recovered)
}

/// Statistics for scanning operations.
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    /// Total announcements scanned
    pub total_scanned: u64,
    /// Announcements that passed the view tag filter
    pub view_tag_matches: u64,
    /// Announcements verified as ours
    pub discoveries: u64,
    /// Tag collisions caught by the address check
    pub address_mismatches: u64,
    /// Malformed announcements
    pub errors: u64,
    /// Duration of the scan in milliseconds
    pub duration_ms: u64,
}

impl ScanStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a scan result.
    pub fn record(&mut self, result: &ScanResult) {
        self.total_scanned += 1;
        match result {
            ScanResult::Matched(_) => {
                self.view_tag_matches += 1;
                self.discoveries += 1;
            }
            ScanResult::AddressMismatch { .. } => {
                self.view_tag_matches += 1;
                self.address_mismatches += 1;
            }
            ScanResult::Invalid(_) => {
                self.errors += 1;
            }
            ScanResult::TagMismatch => {}
        }
    }

    /// Returns the scan rate (announcements per second).
    pub fn rate(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.total_scanned as f64 / self.duration_ms as f64) * 1000.0
        }
    }

    /// Returns the filter efficiency (percentage rejected by the view tag).
    pub fn filter_efficiency(&self) -> f64 {
        if self.total_scanned == 0 {
            0.0
        } else {
            ((self.total_scanned - self.view_tag_matches) as f64 / self.total_scanned as f64) * 100.0
        }
    }
}
