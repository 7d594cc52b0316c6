//! Secret handling for upstream credentials
//!
//! The upstream API key must never appear in logs, error bodies, or debug
//! output. `SecretString` wraps the raw value and redacts it everywhere
//! except through an explicit accessor.

use std::fmt;

/// A wrapper type for sensitive strings like API keys
#[derive(Clone)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    /// Create a new secret string
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value (use with caution)
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    /// Check if the secret is empty
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// A short prefix preview for startup diagnostics, never the full key
    pub fn preview(&self) -> String {
        if self.value.is_empty() {
            return "[EMPTY]".to_string();
        }
        // Counted in characters: byte slicing would panic on a multi-byte
        // boundary, and the key is an arbitrary env string
        if self.value.chars().count() <= 10 {
            return "[REDACTED]".to_string();
        }
        let prefix: String = self.value.chars().take(10).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
