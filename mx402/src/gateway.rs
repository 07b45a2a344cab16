//! Access to a MultiversX network gateway (proxy) over HTTP.
//!
//! [`Gateway`] is the seam through which the relay and verification services
//! reach the ledger. [`HttpGateway`] implements it against the public proxy API:
//!
//! - `POST /transaction/send` - broadcast a signed transaction
//! - `POST /transaction/simulate` - dry-run a signed transaction
//! - `GET /address/{bech32}` - read an account nonce
//! - `GET /network/config` - read the chain id served by the gateway
//!
//! Every proxy response is wrapped in `{ "data": …, "error": "…", "code": "…" }`.
//! A non-empty `error` is surfaced verbatim as [`GatewayError::Rejected`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::Address;
use crate::exact::SignedTransaction;
use crate::proto::TransactionObject;

/// Default deadline for a single gateway call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors produced while talking to a gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The network refused the request; the reason is the network's own message.
    #[error("{0}")]
    Rejected(String),
    /// The request did not complete before the deadline.
    #[error("{context}: gateway request timed out")]
    Timeout {
        /// Which request timed out (e.g. `"POST /transaction/send"`).
        context: &'static str,
    },
    /// The HTTP request could not be sent or its body could not be read.
    #[error("{context}: {source}")]
    Http {
        /// Which request failed.
        context: &'static str,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The gateway answered with an unexpected status and no error message.
    #[error("{context}: unexpected status {status}: {body}")]
    HttpStatus {
        /// Which request failed.
        context: &'static str,
        /// HTTP status code returned.
        status: StatusCode,
        /// Raw response body.
        body: String,
    },
    /// The response body did not have the expected shape.
    #[error("{context}: {message}")]
    Decode {
        /// Which request failed.
        context: &'static str,
        /// What was wrong with the body.
        message: String,
    },
    /// The gateway base URL or an endpoint path is invalid.
    #[error("{context}: {source}")]
    UrlParse {
        /// Which URL failed to parse.
        context: &'static str,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
}

impl GatewayError {
    /// Returns `true` if the request ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// The ledger operations the facilitator depends on.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Broadcasts a signed transaction and returns its hash.
    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<String, GatewayError>;

    /// Simulates a signed transaction without broadcasting it.
    ///
    /// Returns the simulated transaction hash on success and
    /// [`GatewayError::Rejected`] with the failure reason otherwise.
    async fn simulate_transaction(&self, tx: &SignedTransaction) -> Result<String, GatewayError>;

    /// Returns the current nonce of an account.
    async fn account_nonce(&self, address: &Address) -> Result<u64, GatewayError>;

    /// Returns the chain id (`erd_chain_id`) of the network behind the gateway.
    async fn network_chain_id(&self) -> Result<String, GatewayError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    error: String,
    #[serde(default)]
    code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendData {
    tx_hash: String,
}

#[derive(Deserialize)]
struct SimulateData {
    #[serde(default)]
    result: Option<SimulationResult>,
    #[serde(flatten)]
    direct: SimulationResult,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SimulationResult {
    #[serde(default)]
    status: String,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    fail_reason: String,
}

#[derive(Deserialize)]
struct AccountData {
    account: AccountInfo,
}

#[derive(Deserialize)]
struct AccountInfo {
    nonce: u64,
}

#[derive(Deserialize)]
struct NetworkConfigData {
    config: NetworkConfig,
}

#[derive(Deserialize)]
struct NetworkConfig {
    erd_chain_id: String,
}

/// A [`Gateway`] backed by the MultiversX proxy HTTP API.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    /// Base URL of the gateway, always ending in `/`
    base_url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Per-request timeout
    timeout: Option<Duration>,
}

impl HttpGateway {
    /// Creates a gateway client for the given base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            client: Client::new(),
            timeout: None,
        }
    }

    /// Sets a timeout applied to every request.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the gateway base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, context: &'static str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|source| GatewayError::UrlParse { context, source })
    }

    fn transport_error(context: &'static str, source: reqwest::Error) -> GatewayError {
        if source.is_timeout() {
            GatewayError::Timeout { context }
        } else {
            GatewayError::Http { context, source }
        }
    }

    async fn post_json<R>(
        &self,
        url: Url,
        context: &'static str,
        payload: &TransactionObject,
    ) -> Result<R, GatewayError>
    where
        R: serde::de::DeserializeOwned,
    {
        let mut req = self.client.post(url).json(payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let response = req
            .send()
            .await
            .map_err(|e| Self::transport_error(context, e))?;
        Self::read_envelope(response, context).await
    }

    async fn get_json<R>(&self, url: Url, context: &'static str) -> Result<R, GatewayError>
    where
        R: serde::de::DeserializeOwned,
    {
        let mut req = self.client.get(url);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let response = req
            .send()
            .await
            .map_err(|e| Self::transport_error(context, e))?;
        Self::read_envelope(response, context).await
    }

    async fn read_envelope<R>(
        response: reqwest::Response,
        context: &'static str,
    ) -> Result<R, GatewayError>
    where
        R: serde::de::DeserializeOwned,
    {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error(context, e))?;
        let envelope = match serde_json::from_str::<Envelope<R>>(&body) {
            Ok(envelope) => envelope,
            Err(_) if status != StatusCode::OK => {
                return Err(GatewayError::HttpStatus {
                    context,
                    status,
                    body,
                });
            }
            Err(e) => {
                return Err(GatewayError::Decode {
                    context,
                    message: e.to_string(),
                });
            }
        };
        if !envelope.error.is_empty() {
            return Err(GatewayError::Rejected(envelope.error));
        }
        if status != StatusCode::OK {
            return Err(GatewayError::HttpStatus {
                context,
                status,
                body,
            });
        }
        envelope.data.ok_or_else(|| GatewayError::Decode {
            context,
            message: format!("response has no data (code {:?})", envelope.code),
        })
    }
}

/// Converts a string URL into an [`HttpGateway`].
impl TryFrom<&str> for HttpGateway {
    type Error = GatewayError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(value).map_err(|source| GatewayError::UrlParse {
            context: "Failed to parse gateway url",
            source,
        })?;
        Ok(Self::new(url))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(sender = %tx.sender)))]
    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<String, GatewayError> {
        const CONTEXT: &str = "POST /transaction/send";
        let url = self.endpoint("transaction/send", CONTEXT)?;
        let data: SendData = self
            .post_json(url, CONTEXT, &TransactionObject::from(tx))
            .await?;
        Ok(data.tx_hash)
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(sender = %tx.sender)))]
    async fn simulate_transaction(&self, tx: &SignedTransaction) -> Result<String, GatewayError> {
        const CONTEXT: &str = "POST /transaction/simulate";
        let url = self.endpoint("transaction/simulate", CONTEXT)?;
        let data: SimulateData = self
            .post_json(url, CONTEXT, &TransactionObject::from(tx))
            .await?;
        let result = data.result.unwrap_or(data.direct);
        if result.status != "success" {
            let reason = if result.fail_reason.is_empty() {
                format!("simulation status not success: {}", result.status)
            } else {
                result.fail_reason
            };
            return Err(GatewayError::Rejected(reason));
        }
        if result.hash.is_empty() {
            return Err(GatewayError::Rejected(
                "simulation returned empty hash".to_owned(),
            ));
        }
        Ok(result.hash)
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(address = %address)))]
    async fn account_nonce(&self, address: &Address) -> Result<u64, GatewayError> {
        const CONTEXT: &str = "GET /address";
        let url = self.endpoint(&format!("address/{address}"), CONTEXT)?;
        let data: AccountData = self.get_json(url, CONTEXT).await?;
        Ok(data.account.nonce)
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
    async fn network_chain_id(&self) -> Result<String, GatewayError> {
        const CONTEXT: &str = "GET /network/config";
        let url = self.endpoint("network/config", CONTEXT)?;
        let data: NetworkConfigData = self.get_json(url, CONTEXT).await?;
        Ok(data.config.erd_chain_id)
    }
}
