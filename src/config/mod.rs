//! Configuration for the relay
//!
//! All configuration comes from the process environment and is read exactly
//! once at startup into a `RelayConfig` that is passed explicitly to the
//! forwarder and the server. There is no mutable global state.
//!
//! Missing upstream endpoint or key is deliberately NOT a startup failure:
//! `/health` and `/api/test` must still answer on a misconfigured deployment
//! and report what is missing. The completion path surfaces the gap as a
//! per-request configuration error instead.

mod secrets;

pub use secrets::SecretString;

use std::env;
use std::time::Duration;

/// Per-attempt deadline for one upstream HTTP call
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(90);

/// Server-side request deadline, advertised via `/health`
pub const SERVER_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_FRONTEND_ORIGIN: &str = "https://localhost:3000";

/// Read-once configuration for the relay process
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Upstream completion API URL (`LLAMA_API_ENDPOINT`)
    pub endpoint: Option<String>,

    /// Upstream bearer credential (`LLAMA_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Optional deployment/model name forwarded as `model` (`DEPLOY_NAME`)
    pub deploy_name: Option<String>,

    /// Allowed CORS origin for the browser client (`FRONTEND_URL`)
    pub frontend_origin: String,

    /// Listen port (`PORT`)
    pub port: u16,
}

impl RelayConfig {
    /// Build the configuration from the process environment.
    ///
    /// Never fails: absent values stay `None` (or take defaults) and are
    /// reported per-request or at startup as warnings.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|raw| raw.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            endpoint: non_empty_var("LLAMA_API_ENDPOINT"),
            api_key: non_empty_var("LLAMA_API_KEY").map(SecretString::new),
            deploy_name: non_empty_var("DEPLOY_NAME"),
            frontend_origin: non_empty_var("FRONTEND_URL")
                .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGIN.to_string()),
            port,
        }
    }

    /// Whether both upstream endpoint and credential are present
    pub fn is_complete(&self) -> bool {
        self.endpoint.is_some() && self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Endpoint truncated for diagnostics endpoints and logs. Counted in
    /// characters: the endpoint is an arbitrary env string and byte slicing
    /// would panic on a multi-byte boundary.
    pub fn endpoint_preview(&self) -> String {
        match &self.endpoint {
            Some(endpoint) if endpoint.chars().count() > 50 => {
                let prefix: String = endpoint.chars().take(50).collect();
                format!("{}...", prefix)
            }
            Some(endpoint) => endpoint.clone(),
            None => "NOT_SET".to_string(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
