//! Domain types for the MultiversX "exact" payment scheme.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::amount::TokenAmount;
use crate::chain::{Address, ChainId};
use crate::exact::EncodeError;

/// Sentinel asset identifier for the native coin.
pub const NATIVE_ASSET: &str = "EGLD";

static TOKEN_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9]{3,10}-[0-9a-f]{6}$").expect("Invalid token identifier pattern")
});

/// An ESDT token identifier such as `USDC-c76f1f`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenIdentifier(String);

impl TokenIdentifier {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the hex encoding of the identifier bytes, as used in call-data.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }
}

impl FromStr for TokenIdentifier {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if TOKEN_IDENTIFIER.is_match(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(EncodeError::InvalidAsset(s.to_owned()))
        }
    }
}

impl fmt::Display for TokenIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The asset moved by a payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Asset {
    /// The native coin, EGLD.
    Native,
    /// An ESDT token.
    Token(TokenIdentifier),
}

impl Asset {
    /// Selects the transfer mode for this asset.
    #[must_use]
    pub const fn mode(&self) -> TransferMode {
        match self {
            Self::Native => TransferMode::NativeTransfer,
            Self::Token(_) => TransferMode::TokenTransfer,
        }
    }
}

impl FromStr for Asset {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == NATIVE_ASSET {
            Ok(Self::Native)
        } else {
            s.parse().map(Self::Token)
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str(NATIVE_ASSET),
            Self::Token(token) => token.fmt(f),
        }
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// How value moves in a transaction, selected once from the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Value travels as the transaction value.
    NativeTransfer,
    /// Value travels inside `MultiESDTNFTTransfer` call-data.
    TokenTransfer,
}

/// A payer's intent to pay, before encoding.
///
/// Amount and asset stay raw strings; [`encode`](crate::exact::encode)
/// validates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// The payer; token transfers are addressed back to it.
    pub sender: Address,
    /// The merchant receiving the payment.
    pub recipient: Address,
    /// Decimal amount in atomic units.
    pub amount: String,
    /// `EGLD` or an ESDT identifier.
    pub asset: String,
    /// Resource the payment pays for, correlated through call-data.
    pub resource_id: Option<String>,
    /// Target chain.
    pub chain_id: ChainId,
    /// Sender account nonce; zero when absent.
    pub nonce: Option<u64>,
}

/// An unsigned transaction produced by the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTransaction {
    /// Sender account nonce.
    pub nonce: u64,
    /// Native value; zero for token transfers.
    pub value: TokenAmount,
    /// Transaction receiver; the sender itself for token transfers.
    pub receiver: Address,
    /// Gas price in atomic EGLD.
    pub gas_price: u64,
    /// Gas limit.
    pub gas_limit: u64,
    /// Raw call-data bytes.
    pub data: Vec<u8>,
    /// Chain reference (`"1"`, `"D"`, `"T"`, …).
    pub chain_id: String,
    /// Transaction version.
    pub version: u32,
    /// Transaction options bit field.
    pub options: u32,
}

/// A transaction together with its sender and signature.
///
/// The signature covers [`signable_bytes`](crate::signature::signable_bytes)
/// of the unsigned fields and the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// The unsigned fields.
    pub transaction: EncodedTransaction,
    /// The account that signed and pays gas.
    pub sender: Address,
    /// Raw Ed25519 signature bytes.
    pub signature: Vec<u8>,
}

/// A transfer recovered from a transaction by [`decode`](crate::exact::decode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransfer {
    /// Mode the transaction was recognised as.
    pub mode: TransferMode,
    /// Final recipient of the value.
    pub recipient: Address,
    /// Amount moved, in atomic units.
    pub amount: TokenAmount,
    /// Asset moved.
    pub asset: Asset,
    /// Resource correlation carried in call-data.
    pub resource_id: Option<String>,
}
