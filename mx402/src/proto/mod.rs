//! Wire types exchanged with payers, merchants and the network.
//!
//! # Key Types
//!
//! - [`TransactionObject`] - The network's plain-object transaction (base64 call-data),
//!   accepted by `POST /relay` and sent to the gateway
//! - [`PaymentTransaction`] - The transaction inside an x402 exact payload (text call-data)
//! - [`ExactPayload`] - `{ scheme, data }`, optionally wrapped in an x402 v2 envelope
//! - [`PaymentRequirements`] - What the merchant asks for
//! - [`VerifyRequest`] / [`VerifyResponse`] - Verification messages
//! - [`RelayResponse`] - Relay success body
//! - [`SupportedResponse`] - Response from the `/supported` endpoint
//!
//! # Wire Format
//!
//! All types serialize to JSON using camelCase field names; the chain id is
//! spelled `chainID` as on the network.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_with::{VecSkipError, serde_as};

use crate::amount::TokenAmount;
use crate::chain::{Address, ChainId};
use crate::exact::{Asset, EncodedTransaction, ExactScheme, SignedTransaction};

mod error;
pub use error::*;

/// x402 protocol version advertised by this facilitator.
pub const X402_VERSION: u8 = 2;

/// Errors produced while converting wire transactions into domain ones.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionFormatError {
    /// The call-data field is not valid base64.
    #[error("data is not valid base64: {0}")]
    Data(String),
    /// The signature field is not valid hex.
    #[error("signature is not valid hex: {0}")]
    Signature(String),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// A signed transaction as the network's plain object.
///
/// Call-data is base64; the signature is hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionObject {
    /// Sender account nonce.
    pub nonce: u64,
    /// Native value in atomic units.
    pub value: TokenAmount,
    /// Transaction receiver.
    pub receiver: Address,
    /// Transaction sender.
    pub sender: Address,
    /// Gas price.
    pub gas_price: u64,
    /// Gas limit.
    pub gas_limit: u64,
    /// Base64 call-data, absent when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Chain reference.
    #[serde(rename = "chainID")]
    pub chain_id: String,
    /// Transaction version.
    pub version: u32,
    /// Options bit field, absent when zero.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub options: u32,
    /// Hex-encoded Ed25519 signature.
    pub signature: String,
}

impl From<&SignedTransaction> for TransactionObject {
    fn from(signed: &SignedTransaction) -> Self {
        let tx = &signed.transaction;
        Self {
            nonce: tx.nonce,
            value: tx.value,
            receiver: tx.receiver,
            sender: signed.sender,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            data: (!tx.data.is_empty()).then(|| BASE64.encode(&tx.data)),
            chain_id: tx.chain_id.clone(),
            version: tx.version,
            options: tx.options,
            signature: hex::encode(&signed.signature),
        }
    }
}

impl TryFrom<TransactionObject> for SignedTransaction {
    type Error = TransactionFormatError;

    fn try_from(value: TransactionObject) -> Result<Self, Self::Error> {
        let data = match value.data.as_deref() {
            None | Some("") => Vec::new(),
            Some(encoded) => BASE64
                .decode(encoded)
                .map_err(|e| TransactionFormatError::Data(e.to_string()))?,
        };
        let signature = hex::decode(&value.signature)
            .map_err(|e| TransactionFormatError::Signature(e.to_string()))?;
        Ok(Self {
            transaction: EncodedTransaction {
                nonce: value.nonce,
                value: value.value,
                receiver: value.receiver,
                gas_price: value.gas_price,
                gas_limit: value.gas_limit,
                data,
                chain_id: value.chain_id,
                version: value.version,
                options: value.options,
            },
            sender: value.sender,
            signature,
        })
    }
}

/// The transaction carried in an x402 exact payload.
///
/// Same fields as [`TransactionObject`] but call-data travels as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    /// Sender account nonce.
    pub nonce: u64,
    /// Native value in atomic units.
    pub value: TokenAmount,
    /// Transaction receiver.
    pub receiver: Address,
    /// Transaction sender.
    pub sender: Address,
    /// Gas price.
    pub gas_price: u64,
    /// Gas limit.
    pub gas_limit: u64,
    /// Call-data as text.
    #[serde(default)]
    pub data: String,
    /// Chain reference.
    #[serde(rename = "chainID")]
    pub chain_id: String,
    /// Transaction version.
    pub version: u32,
    /// Options bit field.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub options: u32,
    /// Hex-encoded Ed25519 signature.
    pub signature: String,
}

impl TryFrom<&SignedTransaction> for PaymentTransaction {
    type Error = TransactionFormatError;

    fn try_from(signed: &SignedTransaction) -> Result<Self, Self::Error> {
        let tx = &signed.transaction;
        let data = String::from_utf8(tx.data.clone())
            .map_err(|e| TransactionFormatError::Data(e.to_string()))?;
        Ok(Self {
            nonce: tx.nonce,
            value: tx.value,
            receiver: tx.receiver,
            sender: signed.sender,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            data,
            chain_id: tx.chain_id.clone(),
            version: tx.version,
            options: tx.options,
            signature: hex::encode(&signed.signature),
        })
    }
}

impl TryFrom<PaymentTransaction> for SignedTransaction {
    type Error = TransactionFormatError;

    fn try_from(value: PaymentTransaction) -> Result<Self, Self::Error> {
        let signature = hex::decode(&value.signature)
            .map_err(|e| TransactionFormatError::Signature(e.to_string()))?;
        Ok(Self {
            transaction: EncodedTransaction {
                nonce: value.nonce,
                value: value.value,
                receiver: value.receiver,
                gas_price: value.gas_price,
                gas_limit: value.gas_limit,
                data: value.data.into_bytes(),
                chain_id: value.chain_id,
                version: value.version,
                options: value.options,
            },
            sender: value.sender,
            signature,
        })
    }
}

/// An exact-scheme payment payload: `{ "scheme": …, "data": { … } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactPayload {
    /// Pinned scheme version the call-data follows.
    pub scheme: ExactScheme,
    /// The signed transaction.
    pub data: PaymentTransaction,
}

impl ExactPayload {
    /// Parses a payload, unwrapping an x402 v2 envelope
    /// (`{ "x402Version": 2, "payload": { … } }`) when present.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload does not have the exact-scheme shape.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let inner = match value {
            serde_json::Value::Object(mut map)
                if map.contains_key("x402Version") && map.contains_key("payload") =>
            {
                map.remove("payload").unwrap_or_default()
            }
            other => other,
        };
        serde_json::from_value(inner)
    }

    /// Wraps this payload in an x402 v2 envelope.
    #[must_use]
    pub fn into_envelope(self) -> PaymentEnvelope {
        PaymentEnvelope {
            x402_version: X402_VERSION,
            payload: self,
        }
    }
}

/// An x402 v2 payment payload envelope around an [`ExactPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEnvelope {
    /// Protocol version.
    pub x402_version: u8,
    /// The exact-scheme payload.
    pub payload: ExactPayload,
}

const fn native_asset() -> Asset {
    Asset::Native
}

/// Scheme-specific extra requirement fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsExtra {
    /// Resource the payment must be correlated with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

/// A merchant's payment requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Scheme version the payment must use.
    pub scheme: ExactScheme,
    /// Network the payment must target.
    pub network: ChainId,
    /// Merchant address.
    pub pay_to: Address,
    /// Minimum amount in atomic units.
    pub amount: TokenAmount,
    /// Asset to pay with; `EGLD` when absent.
    #[serde(default = "native_asset")]
    pub asset: Asset,
    /// Scheme-specific extras.
    #[serde(default)]
    pub extra: RequirementsExtra,
}

impl PaymentRequirements {
    /// Returns the required resource id, if any.
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        self.extra.resource_id.as_deref().filter(|r| !r.is_empty())
    }
}

/// Body of `POST /verify`.
///
/// The payload stays raw JSON so that a malformed payload becomes a
/// verification result rather than a request error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// The claimed payment payload.
    #[serde(alias = "paymentPayload")]
    pub payload: serde_json::Value,
    /// The requirements it must satisfy.
    #[serde(alias = "paymentRequirements")]
    pub requirements: PaymentRequirements,
}

/// Metadata attached to a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyMeta {
    /// Hash the network reported for the simulated transaction.
    pub simulation_hash: String,
}

/// Result of verifying a payload against requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the payment would satisfy the requirements.
    pub is_valid: bool,
    /// Simulation details, present when valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<VerifyMeta>,
    /// Human-readable rejection reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Machine-readable rejection code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<ErrorReason>,
}

impl VerifyResponse {
    /// Constructs a successful verification response.
    #[must_use]
    pub const fn valid(simulation_hash: String) -> Self {
        Self {
            is_valid: true,
            meta: Some(VerifyMeta { simulation_hash }),
            reason: None,
            invalid_reason: None,
        }
    }

    /// Constructs a failed verification response.
    #[must_use]
    pub const fn invalid(reason: ErrorReason, message: String) -> Self {
        Self {
            is_valid: false,
            meta: None,
            reason: Some(message),
            invalid_reason: Some(reason),
        }
    }
}

impl From<PaymentProblem> for VerifyResponse {
    fn from(problem: PaymentProblem) -> Self {
        Self::invalid(problem.reason(), problem.details().to_owned())
    }
}

/// Body of a successful `POST /relay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    /// Hash of the broadcast transaction.
    pub tx_hash: String,
}

/// Describes a payment method supported by the facilitator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedPaymentKind {
    /// The x402 protocol version.
    pub x402_version: u8,
    /// The payment scheme identifier.
    pub scheme: ExactScheme,
    /// CAIP-2 network identifier.
    pub network: ChainId,
}

/// Response from the facilitator's `/supported` endpoint.
///
/// Kinds with an unknown scheme or network are dropped on deserialization.
#[serde_as]
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    /// List of supported payment kinds.
    #[serde_as(as = "VecSkipError<_>")]
    pub kinds: Vec<SupportedPaymentKind>,
}

impl SupportedResponse {
    /// Lists every scheme version on the given network.
    #[must_use]
    pub fn for_chain(chain_id: &ChainId) -> Self {
        Self {
            kinds: ExactScheme::ALL
                .into_iter()
                .map(|scheme| SupportedPaymentKind {
                    x402_version: X402_VERSION,
                    scheme,
                    network: chain_id.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALICE: &str = "erd1qyu5wthldzr8wx5c9ucg83cq4jgy80zy85ryfx475fsz99m4h39s292042";
    const BOB: &str = "erd1spyavw0956vq68xj8y4tenjpq2wd5a9p2c6j8gsz7ztyrnpxrruqzu66jx";

    fn transaction_json() -> serde_json::Value {
        json!({
            "nonce": 5,
            "value": "1000",
            "receiver": BOB,
            "sender": ALICE,
            "gasPrice": 1_000_000_000u64,
            "gasLimit": 50_000,
            "data": "invoice-1",
            "chainID": "D",
            "version": 2,
            "signature": "00".repeat(64),
        })
    }

    #[test]
    fn test_exact_payload_plain_and_enveloped() {
        let plain = json!({"scheme": "multiversx-exact-v1", "data": transaction_json()});
        let enveloped = json!({
            "x402Version": 2,
            "payload": plain.clone(),
            "accepted": {"scheme": "multiversx-exact-v1"},
        });
        let a = ExactPayload::from_json(plain).unwrap();
        let b = ExactPayload::from_json(enveloped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.data.data, "invoice-1");
    }

    #[test]
    fn test_payment_transaction_requires_signature() {
        let mut tx = transaction_json();
        tx.as_object_mut().unwrap().remove("signature");
        let payload = json!({"scheme": "multiversx-exact-v1", "data": tx});
        assert!(ExactPayload::from_json(payload).is_err());
    }

    #[test]
    fn test_transaction_object_data_is_base64() {
        let mut value = transaction_json();
        value["data"] = json!("aW52b2ljZS0x");
        let object: TransactionObject = serde_json::from_value(value).unwrap();
        let signed = SignedTransaction::try_from(object.clone()).unwrap();
        assert_eq!(signed.transaction.data, b"invoice-1");
        assert_eq!(TransactionObject::from(&signed), object);
    }

    #[test]
    fn test_transaction_object_bad_encodings() {
        let mut value = transaction_json();
        value["data"] = json!("%%%");
        let object: TransactionObject = serde_json::from_value(value).unwrap();
        assert!(matches!(
            SignedTransaction::try_from(object),
            Err(TransactionFormatError::Data(_))
        ));

        let mut value = transaction_json();
        value["data"] = json!(null);
        value["signature"] = json!("not-hex");
        let object: TransactionObject = serde_json::from_value(value).unwrap();
        assert!(matches!(
            SignedTransaction::try_from(object),
            Err(TransactionFormatError::Signature(_))
        ));
    }

    #[test]
    fn test_requirements_defaults() {
        let req: PaymentRequirements = serde_json::from_value(json!({
            "scheme": "multiversx-exact-v1",
            "network": "multiversx:D",
            "payTo": BOB,
            "amount": "1000",
            "maxTimeoutSeconds": 60,
        }))
        .unwrap();
        assert_eq!(req.asset, Asset::Native);
        assert_eq!(req.resource_id(), None);
        assert_eq!(req.network.reference(), "D");
    }

    #[test]
    fn test_verify_request_accepts_x402_field_names() {
        let request: VerifyRequest = serde_json::from_value(json!({
            "paymentPayload": {"scheme": "multiversx-exact-v2", "data": transaction_json()},
            "paymentRequirements": {
                "scheme": "multiversx-exact-v2",
                "network": "devnet",
                "payTo": BOB,
                "amount": "1000",
                "asset": "USDC-c76f1f",
                "extra": {"resourceId": "invoice-1"},
            },
        }))
        .unwrap();
        assert_eq!(request.requirements.resource_id(), Some("invoice-1"));
    }

    #[test]
    fn test_verify_response_wire_shape() {
        let valid = serde_json::to_value(VerifyResponse::valid("abc".to_owned())).unwrap();
        assert_eq!(valid, json!({"isValid": true, "meta": {"simulationHash": "abc"}}));
        let invalid = serde_json::to_value(VerifyResponse::invalid(
            ErrorReason::RequirementsNotMet,
            "amount too low".to_owned(),
        ))
        .unwrap();
        assert_eq!(
            invalid,
            json!({"isValid": false, "reason": "amount too low", "invalidReason": "requirements_not_met"})
        );
    }

    #[test]
    fn test_supported_lists_both_versions() {
        let supported = SupportedResponse::for_chain(&ChainId::new("D"));
        let json = serde_json::to_value(&supported).unwrap();
        assert_eq!(json["kinds"][0]["scheme"], "multiversx-exact-v1");
        assert_eq!(json["kinds"][1]["network"], "multiversx:D");
    }

    #[test]
    fn test_supported_skips_unknown_kinds() {
        let supported: SupportedResponse = serde_json::from_value(json!({
            "kinds": [
                { "x402Version": 2, "scheme": "exact", "network": "eip155:1" },
                { "x402Version": 2, "scheme": "multiversx-exact-v2", "network": "multiversx:1" }
            ]
        }))
        .unwrap();
        assert_eq!(supported.kinds.len(), 1);
        assert_eq!(supported.kinds[0].network, ChainId::new("1"));
    }
}
