//! Error types for the MultiversX "exact" payment scheme.

use crate::amount::AmountError;

/// Errors raised while turning a payment request into a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The asset is neither `EGLD` nor a well-formed ESDT identifier.
    #[error("invalid asset identifier: {0:?}")]
    InvalidAsset(String),
    /// The amount is not a non-negative integer or does not fit.
    #[error("invalid amount: {0}")]
    InvalidAmount(AmountError),
    /// The amount has a fractional part.
    #[error("ambiguous decimals: {0:?} implies fractional atomic units")]
    AmbiguousDecimals(String),
    /// A native resource id would be read back as token call-data.
    #[error("resource id {0:?} collides with the token transfer call-data prefix")]
    ReservedResourceId(String),
    /// The scheme identifier is not a pinned exact-scheme version.
    #[error("unknown scheme: {0:?}")]
    UnknownScheme(String),
}

impl From<AmountError> for EncodeError {
    fn from(value: AmountError) -> Self {
        match value {
            AmountError::Fractional(s) => Self::AmbiguousDecimals(s),
            other => Self::InvalidAmount(other),
        }
    }
}

/// Errors raised while recovering a transfer from a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Call-data names a transfer function but its arguments do not fit the layout.
    #[error("malformed token transfer call-data: {0}")]
    MalformedTokenTransfer(String),
    /// Call-data does not match the native layout of the scheme.
    #[error("malformed native transfer call-data: {0}")]
    MalformedNativeTransfer(String),
    /// Call-data carries more than one token transfer.
    #[error("expected a single token transfer, got {0}")]
    MultipleTransfers(String),
}

/// Errors raised while building a client payment payload.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Requirements could not be encoded into a transaction.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The nonce lookup failed.
    #[error("nonce lookup failed: {0}")]
    Nonce(#[from] crate::gateway::GatewayError),
    /// The signer refused or failed.
    #[error(transparent)]
    Signing(#[from] crate::signer::SignerError),
    /// The signed transaction cannot be expressed as a payload.
    #[error(transparent)]
    Format(#[from] crate::proto::TransactionFormatError),
}
