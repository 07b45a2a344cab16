//! Startup check that the gateway serves the configured network.

use mx402::chain::ChainId;
use mx402::gateway::{Gateway, GatewayError};

/// Why the gateway probe failed.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The gateway could not be reached or answered badly.
    #[error("gateway unreachable: {0}")]
    Unreachable(#[from] GatewayError),
    /// The gateway belongs to another network.
    #[error("gateway serves chain {actual:?}, expected {expected:?}")]
    ChainMismatch {
        /// Configured chain reference.
        expected: String,
        /// Chain reference reported by the gateway.
        actual: String,
    },
}

/// Fetches the gateway's network config and checks its chain id.
///
/// # Errors
///
/// Returns [`ProbeError`] if the gateway fails or serves another chain.
pub async fn probe_gateway(gateway: &dyn Gateway, expected: &ChainId) -> Result<(), ProbeError> {
    let actual = gateway.network_chain_id().await?;
    if actual != expected.reference() {
        return Err(ProbeError::ChainMismatch {
            expected: expected.reference().to_owned(),
            actual,
        });
    }
    tracing::info!(chain_id = %actual, "gateway probed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mx402::gateway::HttpGateway;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway_on(chain_id: &str) -> (MockServer, HttpGateway) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/network/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"config": {"erd_chain_id": chain_id}},
                "error": "",
                "code": "successful"
            })))
            .mount(&server)
            .await;
        let gateway = HttpGateway::try_from(server.uri().as_str()).unwrap();
        (server, gateway)
    }

    #[tokio::test]
    async fn test_matching_chain_passes() {
        let (_server, gateway) = gateway_on("D").await;
        probe_gateway(&gateway, &ChainId::new("D")).await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_chain_is_fatal() {
        let (_server, gateway) = gateway_on("1").await;
        let err = probe_gateway(&gateway, &ChainId::new("D"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::ChainMismatch { ref actual, .. } if actual == "1"));
    }

    #[tokio::test]
    async fn test_unreachable_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;
        let gateway = HttpGateway::try_from(server.uri().as_str()).unwrap();
        let err = probe_gateway(&gateway, &ChainId::new("D"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Unreachable(_)));
    }
}
