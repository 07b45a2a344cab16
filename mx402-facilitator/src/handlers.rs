//! Axum route handlers for the facilitator service.
//!
//! Provides REST endpoints for relay, verify, health and supported operations.
//! Bodies are read as raw bytes so that JSON errors surface as `{ "error" }`
//! responses rather than axum's plain-text rejections.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use mx402::chain::ChainId;
use mx402::gateway::Gateway;
use mx402::proto::{
    AsPaymentProblem, RelayResponse, SupportedResponse, VerifyRequest, VerifyResponse,
};
use mx402::quota::QuotaTracker;
use mx402::relay::RelayService;
use mx402::verify::VerificationService;

use crate::error::ApiError;

/// Services shared by every request.
#[derive(Debug, Clone)]
pub struct Facilitator {
    relay: RelayService,
    verifier: VerificationService,
    chain_id: ChainId,
}

impl Facilitator {
    /// Wires relay and verification services around one gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, quota: Arc<QuotaTracker>, chain_id: ChainId) -> Self {
        Self {
            relay: RelayService::new(Arc::clone(&gateway), quota),
            verifier: VerificationService::new(gateway),
            chain_id,
        }
    }

    /// Sets the deadline applied to each network call.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            relay: self.relay.with_timeout(timeout),
            verifier: self.verifier.with_timeout(timeout),
            chain_id: self.chain_id,
        }
    }

    /// Returns the network this facilitator serves.
    #[must_use]
    pub const fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }
}

/// Shared application state for the facilitator service.
pub type FacilitatorState = Arc<Facilitator>;

/// `POST /relay` - Broadcasts a signed transaction object.
///
/// # Errors
///
/// Returns 400 on a malformed body or bad signature, 429 when the sender's
/// quota is used up, 502 when the network rejects and 504 on timeout.
pub async fn post_relay(
    State(fac): State<FacilitatorState>,
    body: Bytes,
) -> Result<Json<RelayResponse>, ApiError> {
    match fac.relay.relay_json(&body).await {
        Ok(response) => {
            tracing::info!(tx_hash = %response.tx_hash, "relay accepted");
            Ok(Json(response))
        }
        Err(err) => {
            tracing::warn!(reason = %err.as_payment_problem().reason(), error = %err, "relay rejected");
            Err(err.into())
        }
    }
}

/// `POST /verify` - Checks a payment payload against requirements.
///
/// Payment failures are reported in the body with status 200.
///
/// # Errors
///
/// Returns 400 if the envelope or the requirements cannot be parsed.
pub async fn post_verify(
    State(fac): State<FacilitatorState>,
    body: Bytes,
) -> Result<Json<VerifyResponse>, ApiError> {
    let request: VerifyRequest = serde_json::from_slice(&body)?;
    let response = fac
        .verifier
        .verify(request.payload, &request.requirements)
        .await;
    tracing::info!(
        is_valid = response.is_valid,
        reason = ?response.invalid_reason,
        "verify completed"
    );
    Ok(Json(response))
}

/// `GET /health` - Liveness probe.
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /supported` - Returns the list of supported payment kinds.
pub async fn get_supported(State(fac): State<FacilitatorState>) -> Json<SupportedResponse> {
    Json(SupportedResponse::for_chain(fac.chain_id()))
}

/// Creates an Axum [`axum::Router`] with all facilitator endpoints.
///
/// Endpoints:
/// - `POST /relay` - relay a signed transaction
/// - `POST /verify` - verify a payment by simulation
/// - `GET /health` - liveness
/// - `GET /supported` - list supported payment kinds
pub fn facilitator_router(state: FacilitatorState) -> axum::Router {
    axum::Router::new()
        .route("/relay", axum::routing::post(post_relay))
        .route("/verify", axum::routing::post(post_verify))
        .route("/health", axum::routing::get(get_health))
        .route("/supported", axum::routing::get(get_supported))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use mx402::exact::{ExactScheme, PaymentRequest, encode};
    use mx402::gateway::HttpGateway;
    use mx402::proto::{ExactPayload, PaymentTransaction, TransactionObject};
    use mx402::signer::{LocalSigner, Signer, sign_transaction};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BOB: &str = "erd1spyavw0956vq68xj8y4tenjpq2wd5a9p2c6j8gsz7ztyrnpxrruqzu66jx";

    fn router(server: &MockServer, quota_limit: u64) -> axum::Router {
        let gateway = HttpGateway::try_from(server.uri().as_str()).unwrap();
        let facilitator = Facilitator::new(
            Arc::new(gateway),
            Arc::new(QuotaTracker::new(quota_limit)),
            ChainId::new("D"),
        )
        .with_timeout(Duration::from_millis(200));
        facilitator_router(Arc::new(facilitator))
    }

    async fn signed_payment(amount: &str) -> mx402::exact::SignedTransaction {
        let signer = LocalSigner::from_seed([3u8; 32]);
        let request = PaymentRequest {
            sender: signer.address(),
            recipient: BOB.parse().unwrap(),
            amount: amount.to_owned(),
            asset: "EGLD".to_owned(),
            resource_id: None,
            chain_id: ChainId::new("D"),
            nonce: Some(4),
        };
        let tx = encode(ExactScheme::V1, &request).unwrap();
        sign_transaction(&signer, tx).await.unwrap()
    }

    async fn call(router: axum::Router, verb: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(verb)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn mock_send(server: &MockServer, template: ResponseTemplate, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/transaction/send"))
            .respond_with(template)
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn send_ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "data": {"txHash": "a1b2c3"},
            "error": "",
            "code": "successful"
        }))
    }

    fn requirements(amount: u64) -> Value {
        json!({
            "scheme": "multiversx-exact-v1",
            "network": "multiversx:D",
            "payTo": BOB,
            "amount": amount.to_string(),
            "asset": "EGLD"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        let (status, body) = call(router(&server, 10), "GET", "/health", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_supported_lists_configured_network() {
        let server = MockServer::start().await;
        let (status, body) = call(router(&server, 10), "GET", "/supported", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        let kinds = body["kinds"].as_array().unwrap();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.iter().all(|k| k["network"] == "multiversx:D"));
    }

    #[tokio::test]
    async fn test_relay_returns_tx_hash() {
        let server = MockServer::start().await;
        mock_send(&server, send_ok(), 1).await;
        let object = TransactionObject::from(&signed_payment("1000").await);
        let (status, body) = call(
            router(&server, 10),
            "POST",
            "/relay",
            serde_json::to_value(object).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["txHash"], "a1b2c3");
    }

    #[tokio::test]
    async fn test_relay_rejects_zero_signature() {
        let server = MockServer::start().await;
        mock_send(&server, send_ok(), 0).await;
        let mut object = TransactionObject::from(&signed_payment("1000").await);
        object.signature = "00".repeat(64);
        let (status, body) = call(
            router(&server, 10),
            "POST",
            "/relay",
            serde_json::to_value(object).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("Invalid") && message.contains("signature"));
    }

    #[tokio::test]
    async fn test_relay_malformed_body() {
        let server = MockServer::start().await;
        mock_send(&server, send_ok(), 0).await;
        let (status, body) =
            call(router(&server, 10), "POST", "/relay", json!({"nonce": "x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_relay_quota_exceeded() {
        let server = MockServer::start().await;
        mock_send(&server, send_ok(), 1).await;
        let app = router(&server, 1);
        let object = serde_json::to_value(TransactionObject::from(&signed_payment("1000").await))
            .unwrap();
        let (first, _) = call(app.clone(), "POST", "/relay", object.clone()).await;
        let (second, body) = call(app, "POST", "/relay", object).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"].as_str().unwrap().contains("quota"));
    }

    #[tokio::test]
    async fn test_relay_network_rejection() {
        let server = MockServer::start().await;
        mock_send(
            &server,
            ResponseTemplate::new(400).set_body_json(json!({
                "data": null,
                "error": "insufficient funds",
                "code": "bad_request"
            })),
            1,
        )
        .await;
        let object = TransactionObject::from(&signed_payment("1000").await);
        let (status, body) = call(
            router(&server, 10),
            "POST",
            "/relay",
            serde_json::to_value(object).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "insufficient funds");
    }

    #[tokio::test]
    async fn test_relay_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/send"))
            .respond_with(send_ok().set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        let object = TransactionObject::from(&signed_payment("1000").await);
        let (status, _) = call(
            router(&server, 10),
            "POST",
            "/relay",
            serde_json::to_value(object).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }

    async fn payload(amount: &str) -> Value {
        let data = PaymentTransaction::try_from(&signed_payment(amount).await).unwrap();
        serde_json::to_value(ExactPayload {
            scheme: ExactScheme::V1,
            data,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_verify_valid_payment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/simulate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"result": {"status": "success", "hash": "sim-1"}},
                "error": "",
                "code": "successful"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let body = json!({ "payload": payload("1000").await, "requirements": requirements(1000) });
        let (status, body) = call(router(&server, 10), "POST", "/verify", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], true);
        assert_eq!(body["meta"]["simulationHash"], "sim-1");
    }

    #[tokio::test]
    async fn test_verify_underpayment_skips_simulation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/simulate"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let body = json!({ "payload": payload("500").await, "requirements": requirements(1000) });
        let (status, body) = call(router(&server, 10), "POST", "/verify", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], false);
        assert_eq!(body["invalidReason"], "requirements_not_met");
    }

    #[tokio::test]
    async fn test_verify_malformed_payload_is_a_result() {
        let server = MockServer::start().await;
        let body = json!({ "payload": {"scheme": "multiversx-exact-v1"}, "requirements": requirements(1000) });
        let (status, body) = call(router(&server, 10), "POST", "/verify", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invalidReason"], "malformed_payload");
    }

    #[tokio::test]
    async fn test_verify_unparseable_requirements() {
        let server = MockServer::start().await;
        let mut requirements = requirements(1000);
        requirements["network"] = json!("eip155:8453");
        let body = json!({ "payload": payload("1000").await, "requirements": requirements });
        let (status, body) = call(router(&server, 10), "POST", "/verify", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid request body"));
    }
}
