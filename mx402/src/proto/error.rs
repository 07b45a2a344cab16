//! Error reason codes for relay and verification failures.
//!
//! Every failure the facilitator reports carries a machine-readable
//! [`ErrorReason`] next to its human-readable message.

use serde::{Deserialize, Serialize};

/// Machine-readable error reason codes.
///
/// These codes are used in error responses to allow clients to
/// programmatically handle different failure scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorReason {
    /// The payload is missing fields or has ill-shaped values.
    MalformedPayload,
    /// The transaction signature does not match its sender.
    InvalidSignature,
    /// The sender has used up its relay quota.
    QuotaExceeded,
    /// The transaction does not satisfy the payment requirements.
    RequirementsNotMet,
    /// The network rejected the transaction or simulation.
    NetworkError,
    /// The network did not answer in time.
    NetworkTimeout,
}

impl ErrorReason {
    /// Returns the `snake_case` string representation matching the wire format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "malformed_payload",
            Self::InvalidSignature => "invalid_signature",
            Self::QuotaExceeded => "quota_exceeded",
            Self::RequirementsNotMet => "requirements_not_met",
            Self::NetworkError => "network_error",
            Self::NetworkTimeout => "network_timeout",
        }
    }
}

impl core::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for converting errors into structured payment problems.
pub trait AsPaymentProblem {
    /// Converts this error into a [`PaymentProblem`].
    fn as_payment_problem(&self) -> PaymentProblem;
}

/// A structured payment error with reason code and details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProblem {
    /// The machine-readable error reason.
    reason: ErrorReason,
    /// Human-readable error details.
    details: String,
}

impl PaymentProblem {
    /// Creates a new payment problem with the given reason and details.
    #[must_use]
    pub const fn new(reason: ErrorReason, details: String) -> Self {
        Self { reason, details }
    }

    /// Returns the error reason code.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        self.reason
    }

    /// Returns the human-readable error details.
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }
}
