//! Relay service: forwards payer-signed transactions to the network.
//!
//! A relay request moves through a fixed pipeline, stopping at the first
//! failure:
//!
//! 1. parse the plain-object transaction ([`RelayError::MalformedPayload`])
//! 2. check its Ed25519 signature ([`RelayError::InvalidSignature`])
//! 3. consume one unit of the sender's quota ([`RelayError::QuotaExceeded`])
//! 4. broadcast once ([`RelayError::Network`] or [`RelayError::Timeout`])
//!
//! Quota consumed in step 3 is kept even if the broadcast fails.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::Address;
use crate::exact::SignedTransaction;
use crate::gateway::{DEFAULT_TIMEOUT, Gateway, GatewayError};
use crate::proto::{
    AsPaymentProblem, ErrorReason, PaymentProblem, RelayResponse, TransactionFormatError,
    TransactionObject,
};
use crate::quota::QuotaTracker;
use crate::signature::{Ed25519Validator, SignatureValidator};

/// Why a relay request was not broadcast or not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The request is missing fields or has ill-shaped values.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    /// The signature does not match the sender.
    #[error("Invalid inner transaction signature")]
    InvalidSignature,
    /// The sender has no relay quota left.
    #[error("Relay quota exceeded for {0}")]
    QuotaExceeded(Address),
    /// The network rejected the transaction; the message is the network's own.
    #[error("{0}")]
    Network(String),
    /// The network did not answer before the deadline.
    #[error("Network did not respond in time")]
    Timeout,
}

impl AsPaymentProblem for RelayError {
    fn as_payment_problem(&self) -> PaymentProblem {
        let reason = match self {
            Self::MalformedPayload(_) => ErrorReason::MalformedPayload,
            Self::InvalidSignature => ErrorReason::InvalidSignature,
            Self::QuotaExceeded(_) => ErrorReason::QuotaExceeded,
            Self::Network(_) => ErrorReason::NetworkError,
            Self::Timeout => ErrorReason::NetworkTimeout,
        };
        PaymentProblem::new(reason, self.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedPayload(value.to_string())
    }
}

impl From<TransactionFormatError> for RelayError {
    fn from(value: TransactionFormatError) -> Self {
        match value {
            TransactionFormatError::Signature(_) => Self::InvalidSignature,
            TransactionFormatError::Data(_) => Self::MalformedPayload(value.to_string()),
        }
    }
}

impl From<GatewayError> for RelayError {
    fn from(value: GatewayError) -> Self {
        if value.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(value.to_string())
        }
    }
}

/// Verifies, rate-limits and broadcasts signed transactions.
#[derive(Clone)]
pub struct RelayService {
    gateway: Arc<dyn Gateway>,
    validator: Arc<dyn SignatureValidator>,
    quota: Arc<QuotaTracker>,
    timeout: Duration,
}

impl std::fmt::Debug for RelayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayService")
            .field("quota", &self.quota)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RelayService {
    /// Creates a relay using Ed25519 validation and the default network deadline.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, quota: Arc<QuotaTracker>) -> Self {
        Self {
            gateway,
            validator: Arc::new(Ed25519Validator),
            quota,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replaces the signature validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn SignatureValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the deadline for the broadcast call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the shared quota tracker.
    #[must_use]
    pub const fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }

    /// Relays a raw JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] describing the first pipeline step that failed.
    pub async fn relay_json(&self, body: &[u8]) -> Result<RelayResponse, RelayError> {
        let object: TransactionObject = serde_json::from_slice(body)?;
        self.relay(object).await
    }

    /// Relays a parsed plain-object transaction.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] describing the first pipeline step that failed.
    pub async fn relay(&self, object: TransactionObject) -> Result<RelayResponse, RelayError> {
        let signed = SignedTransaction::try_from(object)?;
        self.relay_signed(&signed).await
    }

    /// Relays an already decoded signed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] describing the first pipeline step that failed.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(sender = %signed.sender)))]
    pub async fn relay_signed(
        &self,
        signed: &SignedTransaction,
    ) -> Result<RelayResponse, RelayError> {
        if !self.validator.verify_transaction(signed) {
            return Err(RelayError::InvalidSignature);
        }
        if !self.quota.try_consume(&signed.sender) {
            return Err(RelayError::QuotaExceeded(signed.sender));
        }

        let tx_hash = tokio::time::timeout(self.timeout, self.gateway.send_transaction(signed))
            .await
            .map_err(|_| RelayError::Timeout)??;

        #[cfg(feature = "telemetry")]
        tracing::info!(tx_hash = %tx_hash, "relayed transaction");

        Ok(RelayResponse { tx_hash })
    }
}
