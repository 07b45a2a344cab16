//! Transaction signers.
//!
//! [`Signer`] is the seam through which payers sign transactions; wallets,
//! hardware devices or remote key services plug in behind it. [`LocalSigner`]
//! holds an Ed25519 secret key in memory.

use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey};
use std::fmt;

use crate::chain::Address;
use crate::exact::{EncodedTransaction, SignedTransaction};
use crate::signature::signable_bytes;

/// Errors produced by signers.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The secret key material is malformed.
    #[error("invalid secret key: {0}")]
    InvalidKey(String),
    /// The signing backend refused or failed.
    #[error("signing failed: {0}")]
    Failed(String),
}

/// Signs arbitrary bytes on behalf of a single MultiversX account.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The account this signer signs for.
    fn address(&self) -> Address;

    /// Signs `message`, returning the 64-byte Ed25519 signature.
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;
}

/// Signs a transaction with `signer` as its sender.
///
/// # Errors
///
/// Returns [`SignerError`] if the signable bytes cannot be produced or the
/// signer fails.
pub async fn sign_transaction<S: Signer + ?Sized>(
    signer: &S,
    transaction: EncodedTransaction,
) -> Result<SignedTransaction, SignerError> {
    let sender = signer.address();
    let bytes =
        signable_bytes(&transaction, &sender).map_err(|e| SignerError::Failed(e.to_string()))?;
    let signature = signer.sign(&bytes).await?;
    Ok(SignedTransaction {
        transaction,
        sender,
        signature,
    })
}

/// An in-memory Ed25519 signer.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
}

impl LocalSigner {
    /// Creates a signer from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// Creates a signer from a hex-encoded 32-byte secret seed.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidKey`] if the string is not 64 hex characters.
    pub fn from_hex(seed: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(seed.trim()).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| SignerError::InvalidKey(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Self::from_seed(seed))
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Address {
        Address::from_bytes(self.key.verifying_key().to_bytes())
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::TokenAmount;
    use crate::signature::{Ed25519Validator, SignatureValidator};

    fn transaction(receiver: Address) -> EncodedTransaction {
        EncodedTransaction {
            nonce: 1,
            value: TokenAmount::from(5),
            receiver,
            gas_price: 1_000_000_000,
            gas_limit: 50_000,
            data: Vec::new(),
            chain_id: "T".to_owned(),
            version: 2,
            options: 0,
        }
    }

    #[tokio::test]
    async fn test_signed_transaction_verifies() {
        let signer = LocalSigner::from_seed([3u8; 32]);
        let signed = sign_transaction(&signer, transaction(signer.address()))
            .await
            .unwrap();
        assert_eq!(signed.sender, signer.address());
        assert_eq!(signed.signature.len(), 64);
        assert!(Ed25519Validator.verify_transaction(&signed));
    }

    #[test]
    fn test_from_hex_requires_32_bytes() {
        let signer = LocalSigner::from_hex(&"03".repeat(32)).unwrap();
        assert_eq!(signer.address(), LocalSigner::from_seed([3u8; 32]).address());
        assert!(matches!(
            LocalSigner::from_hex("0303"),
            Err(SignerError::InvalidKey(_))
        ));
        assert!(LocalSigner::from_hex("zz").is_err());
    }
}
