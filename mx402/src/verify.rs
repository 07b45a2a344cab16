//! Verification service: decides whether a payload would satisfy requirements.
//!
//! Verification never broadcasts. It runs in three stages and stops at the
//! first failure:
//!
//! 1. parse the payload, plain or inside an x402 v2 envelope
//! 2. match the transaction against the requirements without touching the network
//! 3. simulate it through the gateway, which also checks the signature

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::amount::TokenAmount;
use crate::chain::Address;
use crate::exact::{
    Asset, DecodeError, DecodedTransfer, ExactScheme, SignedTransaction, TransferMode, decode,
};
use crate::gateway::{DEFAULT_TIMEOUT, Gateway, GatewayError};
use crate::proto::{
    AsPaymentProblem, ErrorReason, ExactPayload, PaymentProblem, PaymentRequirements,
    VerifyResponse,
};

/// Ways a well-formed transaction can fail to meet the requirements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequirementMismatch {
    /// The payload uses a different scheme version.
    #[error("scheme mismatch: expected {expected}, got {actual}")]
    Scheme {
        /// Required scheme.
        expected: ExactScheme,
        /// Scheme in the payload.
        actual: ExactScheme,
    },
    /// The transaction targets another chain.
    #[error("network mismatch: expected chain {expected}, got {actual}")]
    ChainId {
        /// Required chain reference.
        expected: String,
        /// Chain reference in the transaction.
        actual: String,
    },
    /// The call-data does not describe a supported transfer.
    #[error("unsupported transfer: {0}")]
    Undecodable(#[from] DecodeError),
    /// A token transfer is not addressed back to its sender.
    #[error("token transfer must be sent to the sender itself")]
    NotSelfAddressed,
    /// A token transfer also moves native value.
    #[error("token transfer must carry zero native value")]
    NonZeroValue,
    /// The value goes to someone other than the merchant.
    #[error("receiver mismatch: expected {expected}, got {actual}")]
    Recipient {
        /// Required recipient.
        expected: Address,
        /// Recipient found in the transaction.
        actual: Address,
    },
    /// A different asset is moved.
    #[error("asset mismatch: expected {expected}, got {actual}")]
    Asset {
        /// Required asset.
        expected: Asset,
        /// Asset found in the transaction.
        actual: Asset,
    },
    /// Less than the required amount is moved.
    #[error("amount too low: expected at least {required}, got {actual}")]
    Amount {
        /// Minimum required amount.
        required: TokenAmount,
        /// Amount found in the transaction.
        actual: TokenAmount,
    },
    /// The resource correlation differs from the required one.
    #[error("resource id mismatch: expected {expected:?}, got {actual:?}")]
    ResourceId {
        /// Required resource id.
        expected: String,
        /// Resource id found in the call-data.
        actual: Option<String>,
    },
}

/// Why a payload failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The payload is structurally invalid.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    /// The transaction does not satisfy the requirements.
    #[error(transparent)]
    RequirementsNotMet(#[from] RequirementMismatch),
    /// Simulation failed; the message is the network's own.
    #[error("{0}")]
    Network(String),
    /// Simulation did not finish before the deadline.
    #[error("Network did not respond in time")]
    Timeout,
}

impl AsPaymentProblem for VerifyError {
    fn as_payment_problem(&self) -> PaymentProblem {
        let reason = match self {
            Self::MalformedPayload(_) => ErrorReason::MalformedPayload,
            Self::RequirementsNotMet(_) => ErrorReason::RequirementsNotMet,
            Self::Network(_) => ErrorReason::NetworkError,
            Self::Timeout => ErrorReason::NetworkTimeout,
        };
        PaymentProblem::new(reason, self.to_string())
    }
}

impl From<GatewayError> for VerifyError {
    fn from(value: GatewayError) -> Self {
        if value.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(value.to_string())
        }
    }
}

/// Checks a signed transaction against requirements without any network call.
///
/// # Errors
///
/// Returns the first [`RequirementMismatch`] found.
pub fn check_requirements(
    scheme: ExactScheme,
    signed: &SignedTransaction,
    requirements: &PaymentRequirements,
) -> Result<DecodedTransfer, RequirementMismatch> {
    let tx = &signed.transaction;
    if scheme != requirements.scheme {
        return Err(RequirementMismatch::Scheme {
            expected: requirements.scheme,
            actual: scheme,
        });
    }
    if tx.chain_id != requirements.network.reference() {
        return Err(RequirementMismatch::ChainId {
            expected: requirements.network.reference().to_owned(),
            actual: tx.chain_id.clone(),
        });
    }

    let transfer = decode(scheme, signed)?;
    if transfer.mode == TransferMode::TokenTransfer {
        if tx.receiver != signed.sender {
            return Err(RequirementMismatch::NotSelfAddressed);
        }
        if tx.value != TokenAmount::ZERO {
            return Err(RequirementMismatch::NonZeroValue);
        }
    }
    if transfer.recipient != requirements.pay_to {
        return Err(RequirementMismatch::Recipient {
            expected: requirements.pay_to,
            actual: transfer.recipient,
        });
    }
    if transfer.asset != requirements.asset {
        return Err(RequirementMismatch::Asset {
            expected: requirements.asset.clone(),
            actual: transfer.asset,
        });
    }
    if transfer.amount < requirements.amount {
        return Err(RequirementMismatch::Amount {
            required: requirements.amount,
            actual: transfer.amount,
        });
    }
    if let Some(expected) = requirements.resource_id()
        && transfer.resource_id.as_deref() != Some(expected)
    {
        return Err(RequirementMismatch::ResourceId {
            expected: expected.to_owned(),
            actual: transfer.resource_id,
        });
    }
    Ok(transfer)
}

/// Verifies payment payloads by structural matching and simulation.
#[derive(Clone)]
pub struct VerificationService {
    gateway: Arc<dyn Gateway>,
    timeout: Duration,
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl VerificationService {
    /// Creates a verifier with the default network deadline.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the deadline for the simulation call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Verifies a raw payload against requirements.
    ///
    /// Every failure is folded into an invalid [`VerifyResponse`].
    pub async fn verify(
        &self,
        payload: serde_json::Value,
        requirements: &PaymentRequirements,
    ) -> VerifyResponse {
        match self.verify_payload(payload, requirements).await {
            Ok(simulation_hash) => VerifyResponse::valid(simulation_hash),
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(reason = %err.as_payment_problem().reason(), error = %err, "payment rejected");
                err.as_payment_problem().into()
            }
        }
    }

    /// Verifies a raw payload, returning the simulation hash on success.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] describing the first stage that failed.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
    pub async fn verify_payload(
        &self,
        payload: serde_json::Value,
        requirements: &PaymentRequirements,
    ) -> Result<String, VerifyError> {
        let payload = ExactPayload::from_json(payload)
            .map_err(|e| VerifyError::MalformedPayload(e.to_string()))?;
        if payload.data.signature.is_empty() {
            return Err(VerifyError::MalformedPayload("missing signature".to_owned()));
        }
        let scheme = payload.scheme;
        let signed = SignedTransaction::try_from(payload.data)
            .map_err(|e| VerifyError::MalformedPayload(e.to_string()))?;

        check_requirements(scheme, &signed, requirements)?;

        let hash = tokio::time::timeout(self.timeout, self.gateway.simulate_transaction(&signed))
            .await
            .map_err(|_| VerifyError::Timeout)??;
        Ok(hash)
    }
}
