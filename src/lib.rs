//! Llama Relay
//!
//! A stateless HTTP relay that accepts chat-completion requests from a
//! browser client, shapes them, and forwards them to a single configured
//! upstream LLM endpoint with bounded retries and per-attempt timeouts.
//! Upstream and transport failures are mapped to a fixed taxonomy of
//! client-facing JSON error responses.

pub mod config;
pub mod forward;
pub mod server;

/// Returns the version of the relay.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
