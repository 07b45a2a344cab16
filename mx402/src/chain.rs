//! MultiversX chain primitives used by the x402 exact scheme.
//!
//! - [`Address`] - A 32-byte Ed25519 public key, rendered as a bech32 `erd1…` string
//! - [`ChainId`] - A MultiversX chain reference (`"1"`, `"D"`, `"T"`, …) with its
//!   CAIP-2 form `multiversx:<reference>`
//!
//! Network strings accepted by [`ChainId::from_network`] follow the aliases used by
//! x402 clients: CAIP-2 (`multiversx:D`), short names (`devnet`) and legacy
//! names (`multiversx-devnet`).

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

use crate::networks;

/// CAIP-2 namespace for MultiversX networks.
pub const MULTIVERSX_NAMESPACE: &str = "multiversx";

/// Human-readable part of every MultiversX user address.
pub const ADDRESS_HRP: &str = "erd";

/// Length of a bech32 `erd1…` address string.
pub const ADDRESS_STRING_LEN: usize = 62;

const ERD: Hrp = Hrp::parse_unchecked(ADDRESS_HRP);

/// Errors produced while parsing a MultiversX address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The string is not exactly 62 characters long.
    #[error("address must be {ADDRESS_STRING_LEN} characters, got {0}")]
    Length(usize),
    /// The string contains uppercase characters.
    #[error("address must be lowercase")]
    Case,
    /// Bech32 decoding or checksum verification failed.
    ///
    /// Bech32m checksums are rejected.
    #[error("invalid bech32 address: {0}")]
    Bech32(String),
    /// A hex public key could not be decoded.
    #[error("invalid hex public key: {0}")]
    Hex(String),
    /// The human-readable part is not `erd`.
    #[error("unexpected address prefix {0:?}")]
    Hrp(String),
    /// The decoded public key is not 32 bytes.
    #[error("address payload must be 32 bytes, got {0}")]
    PayloadLength(usize),
}

/// A MultiversX account address.
///
/// Wraps the raw 32-byte Ed25519 public key. Parses from and displays as the
/// bech32 `erd1…` form; [`Address::to_hex`] gives the hex form used inside
/// transaction call-data.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 32]);

impl Address {
    /// Wraps a raw 32-byte public key.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw public key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the lowercase hex encoding of the public key.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses an address from its 64-character hex public key.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Hex`] for invalid hex and
    /// [`AddressError::PayloadLength`] if it does not decode to 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let bytes = hex::decode(s).map_err(|e| AddressError::Hex(e.to_string()))?;
        let len = bytes.len();
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressError::PayloadLength(len))?;
        Ok(Self(bytes))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_STRING_LEN {
            return Err(AddressError::Length(s.len()));
        }
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(AddressError::Case);
        }
        let checked = CheckedHrpstring::new::<Bech32>(s)
            .map_err(|e| AddressError::Bech32(e.to_string()))?;
        if checked.hrp() != ERD {
            return Err(AddressError::Hrp(checked.hrp().to_string()));
        }
        let data: Vec<u8> = checked.byte_iter().collect();
        let len = data.len();
        let bytes: [u8; 32] = data
            .try_into()
            .map_err(|_| AddressError::PayloadLength(len))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = bech32::encode::<Bech32>(ERD, &self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

/// Error returned when a network string cannot be mapped to a MultiversX chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported network format: {0}")]
pub struct NetworkFormatError(String);

/// A MultiversX chain identifier.
///
/// Holds the chain reference as it appears in a transaction's `chainID` field
/// (`"1"` for mainnet, `"D"` for devnet, `"T"` for testnet, or a custom value).
/// Displays and serializes as CAIP-2 (`multiversx:D`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    reference: String,
}

impl ChainId {
    /// Creates a chain id from a raw chain reference.
    pub fn new<R: Into<String>>(reference: R) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    /// Returns the chain reference, i.e. the transaction `chainID` value.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Resolves a network string to a chain id.
    ///
    /// Accepts well-known names (`mainnet`, `multiversx-devnet`, …) and CAIP-2
    /// strings `multiversx:<reference>`, where custom references are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkFormatError`] for anything else.
    pub fn from_network(network: &str) -> Result<Self, NetworkFormatError> {
        if let Some(info) = networks::by_name(network) {
            return Ok(info.chain_id());
        }
        match network.split_once(':') {
            Some((MULTIVERSX_NAMESPACE, reference)) if !reference.is_empty() => {
                Ok(Self::new(reference))
            }
            _ => Err(NetworkFormatError(network.to_owned())),
        }
    }

    /// Returns the well-known network name for this chain, if any.
    #[must_use]
    pub fn as_network_name(&self) -> Option<&'static str> {
        networks::by_reference(&self.reference).map(|info| info.name)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MULTIVERSX_NAMESPACE}:{}", self.reference)
    }
}

impl FromStr for ChainId {
    type Err = NetworkFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_network(s)
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_network(&s).map_err(de::Error::custom)
    }
}
