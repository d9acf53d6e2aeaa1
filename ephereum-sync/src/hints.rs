//! Short, user-facing wording for error messages.

/// Status message for a failed sync cycle.
pub const SYNC_FAILED: &str = "Sync failed.";

/// Pending-entry reason for a payload that did not decrypt.
pub const DECRYPT_FAILED: &str = "Failed to decrypt.";

/// Case-insensitive needles and the message shown when any of them matches.
/// Checked in order; the first hit wins.
const ERROR_HINTS: &[(&[&str], &str)] = &[
    (
        &["user rejected", "rejected request", "denied transaction signature"],
        "Request was cancelled.",
    ),
    (
        &["insufficient funds"],
        "Insufficient balance to complete this transaction.",
    ),
    (&["invalid password"], "Invalid password."),
    (
        &["failed to fetch", "network"],
        "Network error. Please check your RPC connection and try again.",
    ),
];

/// Maps raw error text to a short message, or `fallback` when nothing matches.
pub fn user_error_message(error: &str, fallback: &str) -> String {
    let raw = error.trim().to_lowercase();
    if raw.is_empty() {
        return fallback.to_string();
    }

    ERROR_HINTS
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| raw.contains(needle)))
        .map_or_else(|| fallback.to_string(), |(_, message)| (*message).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("User rejected the request." => "Request was cancelled." ; "user rejected")]
    #[test_case("MetaMask Tx Signature: User denied transaction signature." => "Request was cancelled." ; "denied signature")]
    #[test_case("insufficient funds for gas * price + value" => "Insufficient balance to complete this transaction." ; "funds")]
    #[test_case("Invalid password" => "Invalid password." ; "password")]
    #[test_case("TypeError: Failed to fetch" => "Network error. Please check your RPC connection and try again." ; "fetch")]
    #[test_case("HTTP request failed: network unreachable" => "Network error. Please check your RPC connection and try again." ; "network")]
    #[test_case("RPC call failed: header not found" => "Sync failed." ; "unmatched")]
    #[test_case("   " => "Sync failed." ; "blank")]
    fn test_user_error_message(raw: &str) -> String {
        user_error_message(raw, "Sync failed.")
    }
}
