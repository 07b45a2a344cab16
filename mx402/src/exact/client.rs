//! Client side of the exact scheme: builds signed payment payloads.
//!
//! Given a merchant's [`PaymentRequirements`], [`ExactClient`] encodes the
//! matching transaction, fills in the sender nonce when a [`NonceSource`] is
//! configured, signs it and returns the `{ scheme, data }` payload.

use async_trait::async_trait;
use std::sync::Arc;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::Address;
use crate::exact::{ClientError, PaymentRequest, encode};
use crate::gateway::{Gateway, GatewayError};
use crate::proto::{ExactPayload, PaymentRequirements, PaymentTransaction};
use crate::signer::{Signer, sign_transaction};

/// Provides the current nonce of an account.
#[async_trait]
pub trait NonceSource: Send + Sync {
    /// Returns the nonce the next transaction from `address` must use.
    async fn nonce(&self, address: &Address) -> Result<u64, GatewayError>;
}

#[async_trait]
impl<G: Gateway + ?Sized> NonceSource for G {
    async fn nonce(&self, address: &Address) -> Result<u64, GatewayError> {
        self.account_nonce(address).await
    }
}

/// Builds exact-scheme payment payloads for one signer.
pub struct ExactClient<S> {
    signer: S,
    nonces: Option<Arc<dyn NonceSource>>,
}

impl<S: Signer> std::fmt::Debug for ExactClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactClient")
            .field("address", &self.signer.address())
            .field("nonces", &self.nonces.is_some())
            .finish()
    }
}

impl<S: Signer> ExactClient<S> {
    /// Creates a client that signs with `signer` and uses nonce zero.
    pub const fn new(signer: S) -> Self {
        Self {
            signer,
            nonces: None,
        }
    }

    /// Looks up the sender nonce through `nonces` before each payment.
    #[must_use]
    pub fn with_nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = Some(nonces);
        self
    }

    /// Returns the paying account.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Builds and signs a payment satisfying `requirements`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if encoding, the nonce lookup or signing fails.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(scheme = %requirements.scheme)))]
    pub async fn create_payment(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<ExactPayload, ClientError> {
        let sender = self.signer.address();
        let nonce = match &self.nonces {
            Some(source) => Some(source.nonce(&sender).await?),
            None => None,
        };
        let request = PaymentRequest {
            sender,
            recipient: requirements.pay_to,
            amount: requirements.amount.to_string(),
            asset: requirements.asset.to_string(),
            resource_id: requirements.resource_id().map(str::to_owned),
            chain_id: requirements.network.clone(),
            nonce,
        };
        let transaction = encode(requirements.scheme, &request)?;
        let signed = sign_transaction(&self.signer, transaction).await?;
        Ok(ExactPayload {
            scheme: requirements.scheme,
            data: PaymentTransaction::try_from(&signed)?,
        })
    }
}
