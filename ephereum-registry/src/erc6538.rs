//! Recipient resolution through the ERC-6538 stealth meta-address registry.

use tracing::{debug, instrument};

use ephereum_core::constants::STEALTH_SCHEME_ID;
use ephereum_core::error::{EphereumError, Result};
use ephereum_core::traits::MetaAddressRegistry;
use ephereum_core::types::{EthAddress, MetaAddress};

/// Turns user input into a recipient meta-address.
///
/// - `st:eth:0x…` or bare `0x…` (134 hex chars) is parsed directly
/// - a 20-byte `0x…` address is looked up in `registry` under scheme `0x02`
///
/// # Errors
/// `InvalidInput` for anything else, or for an address with nothing
/// registered. Registry failures propagate unchanged.
#[instrument(skip(registry))]
pub async fn resolve_recipient(input: &str, registry: &dyn MetaAddressRegistry) -> Result<MetaAddress> {
    let trimmed = input.trim();

    if MetaAddress::is_valid(trimmed) {
        return MetaAddress::parse(trimmed);
    }

    if EthAddress::is_address(trimmed) {
        let registrant = EthAddress::from_hex(trimmed)?;
        debug!(%registrant, "Looking up registered meta-address");

        return registry
            .stealth_meta_address_of(&registrant, u64::from(STEALTH_SCHEME_ID))
            .await?
            .ok_or_else(|| {
                EphereumError::InvalidInput(format!("no meta-address registered for {}", registrant))
            });
    }

    Err(EphereumError::InvalidInput(
        "expected a stealth meta-address or an Ethereum address".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use ephereum_core::types::CompressedPoint;

    #[derive(Default)]
    struct StaticRegistry {
        entries: DashMap<EthAddress, MetaAddress>,
    }

    #[async_trait]
    impl MetaAddressRegistry for StaticRegistry {
        async fn stealth_meta_address_of(&self, registrant: &EthAddress, scheme_id: u64) -> Result<Option<MetaAddress>> {
            assert_eq!(scheme_id, 2);
            Ok(self.entries.get(registrant).map(|e| *e.value()))
        }
    }

    fn meta() -> MetaAddress {
        MetaAddress::new(
            CompressedPoint::from_array([0x02; 33]),
            CompressedPoint::from_array([0x03; 33]),
        )
    }

    #[tokio::test]
    async fn test_meta_address_parsed_directly() {
        let registry = StaticRegistry::default();
        let prefixed = meta().to_prefixed().unwrap();
        let bare = meta().to_hex().unwrap();

        assert_eq!(resolve_recipient(&prefixed, &registry).await.unwrap(), meta());
        assert_eq!(resolve_recipient(&format!("  {}  ", bare), &registry).await.unwrap(), meta());
    }

    #[tokio::test]
    async fn test_address_looked_up() {
        let registry = StaticRegistry::default();
        let who = EthAddress::from_array([0x11; 20]);
        registry.entries.insert(who, meta());

        let found = resolve_recipient(&who.to_hex_string(), &registry).await.unwrap();
        assert_eq!(found, meta());
    }

    #[tokio::test]
    async fn test_unregistered_address() {
        let registry = StaticRegistry::default();
        let err = resolve_recipient(&EthAddress::from_array([0x22; 20]).to_hex_string(), &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, EphereumError::InvalidInput(m) if m.contains("no meta-address")));
    }

    #[tokio::test]
    async fn test_garbage_rejected() {
        let registry = StaticRegistry::default();
        for input in ["", "alice.eth", "0x1234", "st:eth:0xzz"] {
            assert!(matches!(
                resolve_recipient(input, &registry).await,
                Err(EphereumError::InvalidInput(_))
            ));
        }
    }
}
