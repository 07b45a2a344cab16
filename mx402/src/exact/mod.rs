//! MultiversX "exact" payment scheme.
//!
//! A payment is a single signed MultiversX transaction that moves exactly the
//! required amount to the merchant. Native EGLD moves as transaction value;
//! ESDT tokens move through a self-addressed `MultiESDTNFTTransfer` call.
//!
//! # Protocol versions
//!
//! The call-data layout is pinned by the scheme identifier and never guessed:
//!
//! | scheme | native call-data | token trailing args | native gas | token gas |
//! |---|---|---|---|---|
//! | `multiversx-exact-v1` | resource id bytes | `@<resourceHex>` | 50 000 + 1 500/byte | 60 000 000 |
//! | `multiversx-exact-v2` | `pay@<resourceHex>` | `@706179@<resourceHex>` | 10 000 000 | 15 000 000 |

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

pub mod client;
pub mod encoder;
pub mod error;
pub mod types;

pub use encoder::{decode, encode};
pub use error::*;
pub use types::*;

/// Minimum gas price accepted by MultiversX networks.
pub const MIN_GAS_PRICE: u64 = 1_000_000_000;

/// Transaction version produced by the encoder.
pub const TX_VERSION: u32 = 2;

/// Function selector used for resource correlation in v2 call-data.
pub const PAY_FUNCTION: &str = "pay";

/// Built-in function carrying ESDT transfers.
pub const MULTI_TRANSFER_FUNCTION: &str = "MultiESDTNFTTransfer";

/// Pinned protocol version of the exact scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExactScheme {
    /// Resource id as raw call-data (native) or trailing argument (token).
    V1,
    /// Resource id behind an explicit `pay` selector.
    V2,
}

impl ExactScheme {
    /// All supported scheme versions.
    pub const ALL: [Self; 2] = [Self::V1, Self::V2];

    /// Returns the wire identifier of this scheme.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "multiversx-exact-v1",
            Self::V2 => "multiversx-exact-v2",
        }
    }

    /// Fixed gas component of a native transfer.
    #[must_use]
    pub const fn native_gas_base(&self) -> u64 {
        match self {
            Self::V1 => 50_000,
            Self::V2 => 10_000_000,
        }
    }

    /// Gas charged per call-data byte on top of the native base.
    #[must_use]
    pub const fn gas_per_data_byte(&self) -> u64 {
        match self {
            Self::V1 => 1_500,
            Self::V2 => 0,
        }
    }

    /// Gas limit of a token transfer.
    #[must_use]
    pub const fn token_gas_limit(&self) -> u64 {
        match self {
            Self::V1 => 60_000_000,
            Self::V2 => 15_000_000,
        }
    }
}

impl fmt::Display for ExactScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExactScheme {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.as_str() == s)
            .ok_or_else(|| EncodeError::UnknownScheme(s.to_owned()))
    }
}

impl Serialize for ExactScheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExactScheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_roundtrip_through_str() {
        for scheme in ExactScheme::ALL {
            assert_eq!(scheme.as_str().parse::<ExactScheme>().unwrap(), scheme);
        }
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        assert!(matches!(
            "exact".parse::<ExactScheme>(),
            Err(EncodeError::UnknownScheme(_))
        ));
    }

    #[test]
    fn test_token_gas_exceeds_native_base() {
        for scheme in ExactScheme::ALL {
            assert!(scheme.token_gas_limit() > scheme.native_gas_base());
        }
    }
}
