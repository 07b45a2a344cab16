//! Registry of well-known MultiversX networks.
//!
//! Maps the human-readable network names used by x402 clients (`"devnet"`,
//! `"multiversx-devnet"`) to chain references and default gateway URLs.

use crate::chain::ChainId;

/// A known network definition with its chain reference, names and public gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Short network name (e.g., "devnet")
    pub name: &'static str,
    /// Legacy x402 network name (e.g., "multiversx-devnet")
    pub legacy_name: &'static str,
    /// Chain reference as used in the transaction `chainID` field
    pub reference: &'static str,
    /// Default public gateway for this network
    pub gateway_url: &'static str,
}

impl NetworkInfo {
    /// Create a `ChainId` from this network info
    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.reference)
    }
}

/// MultiversX mainnet.
pub const MAINNET: NetworkInfo = NetworkInfo {
    name: "mainnet",
    legacy_name: "multiversx-mainnet",
    reference: "1",
    gateway_url: "https://gateway.multiversx.com",
};

/// MultiversX devnet.
pub const DEVNET: NetworkInfo = NetworkInfo {
    name: "devnet",
    legacy_name: "multiversx-devnet",
    reference: "D",
    gateway_url: "https://devnet-gateway.multiversx.com",
};

/// MultiversX testnet.
pub const TESTNET: NetworkInfo = NetworkInfo {
    name: "testnet",
    legacy_name: "multiversx-testnet",
    reference: "T",
    gateway_url: "https://testnet-gateway.multiversx.com",
};

/// All well-known MultiversX networks.
pub static MULTIVERSX_NETWORKS: &[NetworkInfo] = &[MAINNET, DEVNET, TESTNET];

/// Looks up a network by its short or legacy name.
#[must_use]
pub fn by_name(name: &str) -> Option<&'static NetworkInfo> {
    MULTIVERSX_NETWORKS
        .iter()
        .find(|n| n.name == name || n.legacy_name == name)
}

/// Looks up a network by its chain reference.
#[must_use]
pub fn by_reference(reference: &str) -> Option<&'static NetworkInfo> {
    MULTIVERSX_NETWORKS.iter().find(|n| n.reference == reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_both_names() {
        assert_eq!(by_name("devnet"), Some(&DEVNET));
        assert_eq!(by_name("multiversx-mainnet"), Some(&MAINNET));
        assert_eq!(by_name("base"), None);
    }

    #[test]
    fn test_references_are_unique() {
        for net in MULTIVERSX_NETWORKS {
            assert_eq!(by_reference(net.reference), Some(net));
        }
    }
}
