//! Custom error types for b3
//!
//! Engine-level (fatal) errors. Failures inside a capability never use this
//! type on the way out; they become `{"error": ...}` payloads instead.

use thiserror::Error;

/// Main error type for b3 operations
#[derive(Error, Debug)]
pub enum B3Error {
    /// Model service transport, quota or protocol errors
    #[error("Model service error: {0}")]
    Model(String),

    /// Session used before `start` or created twice
    #[error("Session error: {0}")]
    Session(String),

    /// The model asked for a capability that is not registered
    #[error("unknown capability {name:?} requested from agent {agent}")]
    UnknownCapability { agent: String, name: String },

    /// Too many capability calls for one question
    #[error("call budget of {limit} exceeded")]
    BudgetExceeded { limit: usize },

    /// Delegation into an agent already answering on the current chain
    #[error("delegation cycle: {0}")]
    DelegationCycle(String),

    /// The caller cancelled the question
    #[error("cancelled")]
    Cancelled,

    /// Document store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for b3 operations
pub type Result<T> = std::result::Result<T, B3Error>;

impl B3Error {
    /// Create a model service error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a document store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error came from a caller cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = B3Error::UnknownCapability {
            agent: "B3".into(),
            name: "Nope".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown capability \"Nope\" requested from agent B3"
        );
        assert_eq!(
            B3Error::BudgetExceeded { limit: 3 }.to_string(),
            "call budget of 3 exceeded"
        );
        assert!(B3Error::Cancelled.is_cancelled());
    }
}
