//! The Forwarder: validation, payload shaping, and resilient relaying
//!
//! `Forwarder` holds no per-request state. Each call validates the client
//! request, shapes the upstream payload (history window, token clamp,
//! defaults), and drives the retry loop over the transport. Concurrent
//! requests share only the read-only configuration and the pooled HTTP
//! client.

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::{UpstreamClient, UpstreamResponse, UpstreamTransport};
pub use error::ForwardError;
pub use retry::RetryPolicy;
pub use types::{CompletionRequest, Message, Role, UpstreamPayload};

use crate::config::{RelayConfig, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of the connectivity probe behind `GET /api/test`
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Whether endpoint and key were both configured
    pub configured: bool,

    /// Whether an upstream response (of any status) came back
    pub reachable: bool,

    /// Upstream HTTP status, when one was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Failure description or rejection details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Leading slice of a successful response body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
}

/// Stateless relay from client completion requests to the upstream API
pub struct Forwarder {
    config: Arc<RelayConfig>,
    transport: Arc<dyn UpstreamTransport>,
    policy: RetryPolicy,
}

impl Forwarder {
    /// Build a forwarder with the production transport and default policy
    pub fn new(config: Arc<RelayConfig>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            config,
            transport: Arc::new(UpstreamClient::new()?),
            policy: RetryPolicy::default(),
        })
    }

    /// Build a forwarder over an arbitrary transport (tests use this)
    pub fn with_transport(
        config: Arc<RelayConfig>,
        transport: Arc<dyn UpstreamTransport>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            config,
            transport,
            policy,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Relay one completion request.
    ///
    /// Precondition failures (missing configuration, empty message
    /// sequence) return without any upstream call. On success the upstream
    /// JSON body is returned verbatim, along with the status it came with.
    pub async fn handle_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<UpstreamResponse, ForwardError> {
        let (endpoint, api_key) = self.upstream_target()?;

        if request.messages.is_empty() {
            return Err(ForwardError::InvalidRequest);
        }

        let original_count = request.messages.len();
        let payload = UpstreamPayload::from_request(request, self.config.deploy_name.clone());

        info!(
            original_messages = original_count,
            forwarded_messages = payload.messages.len(),
            max_tokens = payload.max_tokens,
            temperature = payload.temperature as f64,
            top_p = payload.top_p as f64,
            "forwarding completion request"
        );

        self.forward_with_retry(endpoint, api_key, &payload).await
    }

    /// One exploratory upstream call with a fixed trivial payload. Never
    /// errors: the outcome is embedded in the report.
    pub async fn probe(&self) -> ProbeReport {
        let (endpoint, api_key) = match self.upstream_target() {
            Ok(target) => target,
            Err(_) => {
                return ProbeReport {
                    configured: false,
                    reachable: false,
                    status: None,
                    detail: Some(
                        "Configuration incomplete - missing endpoint or API key".to_string(),
                    ),
                    response_preview: None,
                }
            }
        };

        let payload = UpstreamPayload::probe(self.config.deploy_name.clone());
        match self.forward_with_retry(endpoint, api_key, &payload).await {
            Ok(response) => ProbeReport {
                configured: true,
                reachable: true,
                status: Some(response.status),
                detail: None,
                response_preview: Some(preview(&response.body)),
            },
            Err(ForwardError::UpstreamRejected { status, details }) => ProbeReport {
                configured: true,
                reachable: true,
                status: Some(status),
                detail: Some(details),
                response_preview: None,
            },
            Err(error) => ProbeReport {
                configured: true,
                reachable: false,
                status: None,
                detail: Some(error.to_string()),
                response_preview: None,
            },
        }
    }

    fn upstream_target(&self) -> Result<(&str, &SecretString), ForwardError> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or(ForwardError::Configuration {
                var: "LLAMA_API_ENDPOINT",
            })?;
        let api_key = self
            .config
            .api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .ok_or(ForwardError::Configuration {
                var: "LLAMA_API_KEY",
            })?;
        Ok((endpoint, api_key))
    }

    async fn forward_with_retry(
        &self,
        endpoint: &str,
        api_key: &SecretString,
        payload: &UpstreamPayload,
    ) -> Result<UpstreamResponse, ForwardError> {
        let request_id = Uuid::new_v4();
        self.policy
            .run(|attempt| {
                let transport = Arc::clone(&self.transport);
                async move {
                    debug!(%request_id, attempt, "upstream attempt");
                    transport.send(endpoint, api_key, payload, request_id).await
                }
            })
            .await
    }
}

fn preview(body: &Value) -> String {
    let rendered = body.to_string();
    rendered.chars().take(200).collect()
}
