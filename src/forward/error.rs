//! Failure taxonomy for the forwarding path
//!
//! Every way a relayed request can fail maps to exactly one `ForwardError`
//! variant, which in turn fixes the HTTP status returned to the client and
//! whether the retry loop may try again. Transport failures are classified
//! from the structured error reqwest exposes, never by matching on
//! human-readable message text.

use crate::config::UPSTREAM_TIMEOUT;
use axum::http::StatusCode;
use std::error::Error as _;
use std::io;
use thiserror::Error;

/// Errors produced while relaying a completion request upstream
#[derive(Debug, Clone, Error)]
pub enum ForwardError {
    /// Client sent no usable message sequence
    #[error("Invalid messages array")]
    InvalidRequest,

    /// Required upstream endpoint or credential is not configured
    #[error("{var} not configured")]
    Configuration { var: &'static str },

    /// Upstream answered with a non-success HTTP status
    #[error("Upstream API error: {status}")]
    UpstreamRejected { status: u16, details: String },

    /// Connection refused
    #[error("Cannot connect to upstream API - server may be down")]
    Unreachable,

    /// Attempt exceeded its deadline
    #[error("Request timeout - upstream response took longer than {} seconds", UPSTREAM_TIMEOUT.as_secs())]
    Timeout,

    /// Name resolution failed
    #[error("Invalid upstream endpoint - DNS resolution failed")]
    DnsFailure,

    /// Connection reset mid-flight
    #[error("Connection reset by upstream server")]
    ConnectionReset,

    /// Certificate or TLS negotiation failure
    #[error("TLS error while connecting to upstream")]
    Tls,

    /// Upstream returned a body that does not parse as JSON
    #[error("Invalid JSON response from upstream: {message}")]
    MalformedResponse { message: String },

    /// Anything else
    #[error("{message}")]
    Unhandled { message: String },
}

impl ForwardError {
    /// HTTP status returned to the client for this failure
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Unreachable | Self::DnsFailure | Self::ConnectionReset | Self::Tls => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
            Self::Unhandled { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only transport-level failures are worth another attempt. An HTTP
    /// error response from upstream would just repeat on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable | Self::Timeout | Self::DnsFailure | Self::ConnectionReset | Self::Tls
        )
    }

    /// Operator hint included in the error body, where one exists
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Unreachable => Some("Check if the API endpoint is correct and accessible"),
            Self::Timeout => {
                Some("The AI model is taking longer than usual. Try again or reduce message complexity.")
            }
            Self::DnsFailure => Some("Verify LLAMA_API_ENDPOINT URL is correct"),
            Self::ConnectionReset => Some("API server may be overloaded, try again later"),
            Self::Tls => Some("Check upstream endpoint SSL configuration"),
            Self::Unhandled { .. } => Some("Check server logs for more details"),
            _ => None,
        }
    }

    /// Classify a reqwest transport failure into the taxonomy.
    ///
    /// Works from typed information only: reqwest's own predicates plus any
    /// `std::io::Error` found in the source chain. A connect failure whose
    /// io-level cause carries no socket error kind happened before a socket
    /// existed, i.e. during name resolution; one with no io-level cause at
    /// all failed in TLS negotiation.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        let mut saw_io = false;
        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                saw_io = true;
                match io_err.kind() {
                    io::ErrorKind::ConnectionRefused => return Self::Unreachable,
                    io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe => return Self::ConnectionReset,
                    io::ErrorKind::TimedOut => return Self::Timeout,
                    io::ErrorKind::InvalidData => return Self::Tls,
                    io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                        return Self::Unreachable
                    }
                    _ => {}
                }
            }
            source = cause.source();
        }

        if err.is_connect() {
            if saw_io {
                Self::DnsFailure
            } else {
                Self::Tls
            }
        } else {
            Self::Unhandled {
                message: err.to_string(),
            }
        }
    }
}
