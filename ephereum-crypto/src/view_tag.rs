//! View tag computation for efficient scanning.
//!
//! Every announcement carries `keccak256(shared)[0]`. A recipient recomputes
//! the tag from its own ECDH result and only derives the stealth address when
//! the tags agree, so roughly 255 of every 256 foreign announcements are
//! rejected after a single hash.
//!
//! ## Security
//!
//! The tag leaks 8 bits of a hash of the shared secret, leaving 248 bits.
//! It cannot identify the recipient on its own.

use subtle::ConstantTimeEq;

use crate::hash::keccak256;

/// Computes the view tag: the first byte of `keccak256(shared_secret)`.
///
/// # Example
///
/// ```rust
/// use ephereum_crypto::{compute_view_tag, ecdh, generate_keypair};
///
/// let ephemeral = generate_keypair();
/// let view = generate_keypair();
/// let shared = ecdh(&ephemeral.private_key, &view.public_key).unwrap();
/// let tag = compute_view_tag(shared.as_bytes());
/// # let _ = tag;
/// ```
pub fn compute_view_tag(shared_secret: &[u8]) -> u8 {
    keccak256(shared_secret)[0]
}

/// Checks a view tag against the expected value in constant time.
pub fn verify_view_tag(shared_secret: &[u8], expected_tag: u8) -> bool {
    let computed_tag = compute_view_tag(shared_secret);
    computed_tag.ct_eq(&expected_tag).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephereum_core::constants::VIEW_TAG_SPACE;
    use rand::Rng;

    #[test]
    fn test_view_tag_deterministic() {
        let secret = [42u8; 32];
        assert_eq!(compute_view_tag(&secret), compute_view_tag(&secret));
    }

    #[test]
    fn test_view_tag_is_first_keccak_byte() {
        // keccak256("") starts with 0xc5
        assert_eq!(compute_view_tag(b""), 0xc5);
        assert_eq!(compute_view_tag(b"hello"), 0x1c);
    }

    #[test]
    fn test_verify_view_tag() {
        let secret = [99u8; 32];
        let correct_tag = compute_view_tag(&secret);
        let wrong_tag = correct_tag.wrapping_add(1);

        assert!(verify_view_tag(&secret, correct_tag));
        assert!(!verify_view_tag(&secret, wrong_tag));
    }

    #[test]
    fn test_view_tag_distribution() {
        let mut rng = rand::thread_rng();
        let mut counts = [0u64; VIEW_TAG_SPACE];
        let samples = 10_000u64;

        for _ in 0..samples {
            let secret: [u8; 32] = rng.gen();
            counts[compute_view_tag(&secret) as usize] += 1;
        }

        // 255 degrees of freedom: p=0.001 critical value is ~310
        let expected = samples as f64 / VIEW_TAG_SPACE as f64;
        let chi_sq: f64 = counts
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum();
        assert!(chi_sq < 500.0, "View tags are not uniformly distributed: χ² = {}", chi_sq);
    }
}
