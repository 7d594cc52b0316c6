//! Upstream HTTP transport using reqwest

use crate::config::{SecretString, UPSTREAM_TIMEOUT};
use crate::forward::error::ForwardError;
use crate::forward::types::UpstreamPayload;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Upstream error bodies are truncated to this many characters before being
/// attached to an `UpstreamRejected`
const ERROR_DETAILS_LIMIT: usize = 200;

const USER_AGENT: &str = concat!("llama-relay/", env!("CARGO_PKG_VERSION"));

/// Successful upstream answer: the status it came with and the parsed body
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

/// One attempt against the upstream completion API.
///
/// This is the seam between the forwarder and the network: production uses
/// the pooled reqwest client below, tests substitute counted fakes.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Execute a single upstream call. Transport failures, non-success
    /// statuses, and unparseable bodies all surface as `ForwardError`.
    async fn send(
        &self,
        endpoint: &str,
        api_key: &SecretString,
        payload: &UpstreamPayload,
        request_id: Uuid,
    ) -> Result<UpstreamResponse, ForwardError>;
}

/// Shared HTTP client with connection pooling and a per-attempt deadline
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .timeout(UPSTREAM_TIMEOUT)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamTransport for UpstreamClient {
    async fn send(
        &self,
        endpoint: &str,
        api_key: &SecretString,
        payload: &UpstreamPayload,
        request_id: Uuid,
    ) -> Result<UpstreamResponse, ForwardError> {
        debug!(%request_id, "sending upstream request");

        let response = self
            .client
            .post(endpoint)
            .timeout(UPSTREAM_TIMEOUT)
            .bearer_auth(api_key.expose_secret())
            .header("Accept", "application/json")
            .header("X-Request-ID", request_id.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                let classified = ForwardError::from_transport(&e);
                warn!(%request_id, error = %classified, "upstream transport failure");
                classified
            })?;

        let status = response.status();
        debug!(%request_id, status = status.as_u16(), "upstream response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                %request_id,
                status = status.as_u16(),
                "upstream rejected request"
            );
            return Err(ForwardError::UpstreamRejected {
                status: status.as_u16(),
                details: truncate(&body, ERROR_DETAILS_LIMIT),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ForwardError::from_transport(&e))?;

        let body = serde_json::from_str(&body).map_err(|e| {
            warn!(%request_id, "upstream body failed to parse as JSON");
            ForwardError::MalformedResponse {
                message: e.to_string(),
            }
        })?;

        Ok(UpstreamResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
