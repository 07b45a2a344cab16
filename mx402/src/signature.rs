//! Transaction signing bytes and Ed25519 signature validation.
//!
//! MultiversX signs a compact JSON rendering of the unsigned transaction
//! fields in a fixed key order. Transactions with `version >= 2` and the
//! hash-signing option bit set sign the Keccak-256 digest of that JSON instead.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Serialize;
use sha3::{Digest, Keccak256};

use crate::amount::TokenAmount;
use crate::chain::Address;
use crate::exact::{EncodedTransaction, SignedTransaction};

/// Option bit requesting that the signature covers the transaction hash.
pub const OPTION_HASH_SIGN: u32 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignableTransaction<'a> {
    nonce: u64,
    value: TokenAmount,
    receiver: &'a Address,
    sender: &'a Address,
    gas_price: u64,
    gas_limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(rename = "chainID")]
    chain_id: &'a str,
    version: u32,
    #[serde(skip_serializing_if = "is_zero")]
    options: u32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Returns the bytes a sender signs for a transaction.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn signable_bytes(
    tx: &EncodedTransaction,
    sender: &Address,
) -> Result<Vec<u8>, serde_json::Error> {
    let signable = SignableTransaction {
        nonce: tx.nonce,
        value: tx.value,
        receiver: &tx.receiver,
        sender,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        data: (!tx.data.is_empty()).then(|| BASE64.encode(&tx.data)),
        chain_id: &tx.chain_id,
        version: tx.version,
        options: tx.options,
    };
    let json = serde_json::to_vec(&signable)?;
    if tx.version >= 2 && tx.options & OPTION_HASH_SIGN != 0 {
        Ok(Keccak256::digest(&json).to_vec())
    } else {
        Ok(json)
    }
}

/// Checks a signature over signable bytes against a claimed sender.
///
/// Implementations never fail: any problem with the key, the signature or the
/// message yields `false`.
pub trait SignatureValidator: Send + Sync {
    /// Returns `true` only if `signature` is a valid signature of `signable` by `sender`.
    fn verify(&self, signable: &[u8], signature: &[u8], sender: &Address) -> bool;

    /// Verifies a signed transaction against its own sender.
    fn verify_transaction(&self, signed: &SignedTransaction) -> bool {
        signable_bytes(&signed.transaction, &signed.sender)
            .is_ok_and(|bytes| self.verify(&bytes, &signed.signature, &signed.sender))
    }
}

/// Ed25519 validator using the public key embedded in the sender address.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Validator;

impl SignatureValidator for Ed25519Validator {
    fn verify(&self, signable: &[u8], signature: &[u8], sender: &Address) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(sender.as_bytes()) else {
            return false;
        };
        key.verify_strict(signable, &signature).is_ok()
    }
}
