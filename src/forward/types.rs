//! Request and payload types for the completion path
//!
//! A `CompletionRequest` is what the browser client sends; an
//! `UpstreamPayload` is what actually goes to the completion API after
//! history windowing, token clamping, and defaulting.

use serde::{Deserialize, Serialize};

/// Number of trailing messages forwarded upstream. Bounds payload size and
/// upstream cost without changing client-visible history.
pub const HISTORY_WINDOW: usize = 8;

/// Hard ceiling on `max_tokens` in the upstream payload
pub const MAX_TOKENS_CAP: u32 = 8000;

/// Default generation parameters when the client omits them
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
}

/// A single message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Chat-completion request as received from the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Ordered conversation history, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// The body forwarded to the upstream completion API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamPayload {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stream: bool,

    /// Deployment name, present only when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl UpstreamPayload {
    /// Shape a client request into the upstream payload: keep only the last
    /// `HISTORY_WINDOW` messages in original order, clamp `max_tokens`, and
    /// fill in defaults for omitted generation parameters.
    pub fn from_request(request: CompletionRequest, model: Option<String>) -> Self {
        let window_start = request.messages.len().saturating_sub(HISTORY_WINDOW);
        let messages = request.messages[window_start..].to_vec();

        Self {
            messages,
            max_tokens: request
                .max_tokens
                .unwrap_or(DEFAULT_MAX_TOKENS)
                .min(MAX_TOKENS_CAP),
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: request.top_p.unwrap_or(DEFAULT_TOP_P),
            stream: false,
            model,
        }
    }

    /// Fixed trivial payload used by the connectivity probe
    pub fn probe(model: Option<String>) -> Self {
        Self {
            messages: vec![Message {
                role: Role::User,
                content: "Hello, this is a test message.".to_string(),
            }],
            max_tokens: 10,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            stream: false,
            model,
        }
    }
}
