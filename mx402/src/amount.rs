//! Atomic token amounts carried as decimal strings.
//!
//! x402 amounts are always expressed in the asset's smallest unit, so a
//! fractional amount is ambiguous and rejected rather than rescaled.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Errors produced while parsing an atomic amount string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The string is empty, signed, or contains non-digit characters.
    #[error("amount must be a non-negative integer, got {0:?}")]
    NotAnInteger(String),
    /// The amount has a non-zero fractional part.
    #[error("amount {0:?} has a fractional part; amounts are atomic units")]
    Fractional(String),
    /// The value does not fit in 128 bits.
    #[error("amount {0:?} is out of range")]
    Overflow(String),
}

/// A non-negative atomic amount that serializes as a decimal string.
///
/// Accepts `"1000"` and `"1000.000"` (an all-zero fraction) but rejects
/// `"1.5"` with [`AmountError::Fractional`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(u128);

impl TokenAmount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Returns the inner `u128` value.
    #[must_use]
    pub const fn inner(&self) -> u128 {
        self.0
    }

    /// Returns the big-endian hex encoding used in MultiversX call-data.
    ///
    /// Always even-length; zero encodes as `"00"`.
    #[must_use]
    pub fn to_even_hex(&self) -> String {
        let hex = format!("{:x}", self.0);
        if hex.len() % 2 == 1 {
            format!("0{hex}")
        } else {
            hex
        }
    }

    /// Parses a big-endian hex amount as found in call-data.
    ///
    /// An empty string is zero, matching the MultiversX argument convention.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not hex or exceeds 128 bits.
    pub fn from_hex(s: &str) -> Result<Self, AmountError> {
        if s.is_empty() {
            return Ok(Self::ZERO);
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AmountError::NotAnInteger(s.to_owned()));
        }
        u128::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| AmountError::Overflow(s.to_owned()))
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (s, None),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::NotAnInteger(s.to_owned()));
        }
        if let Some(fraction) = fraction {
            if !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AmountError::NotAnInteger(s.to_owned()));
            }
            if fraction.bytes().any(|b| b != b'0') {
                return Err(AmountError::Fractional(s.to_owned()));
            }
        }
        whole
            .parse::<u128>()
            .map(Self)
            .map_err(|_| AmountError::Overflow(s.to_owned()))
    }
}

impl From<u128> for TokenAmount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<TokenAmount> for u128 {
    fn from(value: TokenAmount) -> Self {
        value.0
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Self>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_amounts() {
        assert_eq!("0".parse::<TokenAmount>().unwrap(), TokenAmount::ZERO);
        assert_eq!("1000".parse::<TokenAmount>().unwrap().inner(), 1000);
        assert_eq!("1000.000".parse::<TokenAmount>().unwrap().inner(), 1000);
    }

    #[test]
    fn test_rejects_fractional_amounts() {
        assert_eq!(
            "1.5".parse::<TokenAmount>(),
            Err(AmountError::Fractional("1.5".to_owned()))
        );
    }

    #[test]
    fn test_rejects_malformed_amounts() {
        for input in ["", "-1", "abc", "1e18", ".5", "1.x"] {
            assert!(
                matches!(input.parse::<TokenAmount>(), Err(AmountError::NotAnInteger(_))),
                "input {input:?}"
            );
        }
        let too_big = "1".repeat(40);
        assert!(matches!(
            too_big.parse::<TokenAmount>(),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn test_even_hex() {
        assert_eq!(TokenAmount::from(0).to_even_hex(), "00");
        assert_eq!(TokenAmount::from(1000).to_even_hex(), "03e8");
        assert_eq!(TokenAmount::from(255).to_even_hex(), "ff");
        assert_eq!(TokenAmount::from_hex("03e8").unwrap().inner(), 1000);
        assert_eq!(TokenAmount::from_hex("").unwrap(), TokenAmount::ZERO);
    }

    #[test]
    fn test_serde_as_string() {
        let amount = TokenAmount::from(1_000_000_000_000_000_000);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"1000000000000000000\"");
        assert_eq!(serde_json::from_str::<TokenAmount>(&json).unwrap(), amount);
    }
}
