//! Error Types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Substrings in a raw provider error that indicate upstream throttling.
///
/// Matching is textual because the error text is the only signal the
/// completion endpoints give us.
const RATE_LIMIT_MARKERS: [&str; 3] = ["429", "RESOURCE_EXHAUSTED", "Too Many Requests"];

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Maximum iterations reached in reasoning loop
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Parse error (e.g., tool call parsing)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Session not found (or not owned by the caller)
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited by the upstream endpoint
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Every attempt of the retry budget hit a rate limit
    #[error("Rate limit exceeded after {attempts} attempts. Please wait a minute and try again.")]
    RateLimitExhausted { attempts: u32 },

    /// The invocation ran past its deadline
    #[error("Agent invocation exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// The caller cancelled the invocation
    #[error("Agent invocation was cancelled")]
    Cancelled,

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

/// Retry classification of an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Upstream throttling; worth retrying after a backoff
    RateLimit,
    /// Anything else; never retried
    Other,
}

/// Short, machine-readable failure classification surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimitExhausted,
    MaxIterations,
    DeadlineExceeded,
    Cancelled,
    Auth,
    Config,
    Provider,
    Internal,
}

/// Returns true if `text` carries one of the rate-limit markers.
pub fn has_rate_limit_marker(text: &str) -> bool {
    RATE_LIMIT_MARKERS.iter().any(|marker| text.contains(marker))
        || text.to_lowercase().contains("rate_limit")
}

impl AgentError {
    /// Classify for the retry policy
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimited(_) => ErrorClass::RateLimit,
            // Already the terminal outcome of a retry loop
            Self::RateLimitExhausted { .. } => ErrorClass::Other,
            other if has_rate_limit_marker(&other.to_string()) => ErrorClass::RateLimit,
            _ => ErrorClass::Other,
        }
    }

    /// Check if error is a transient rate limit
    pub fn is_rate_limit(&self) -> bool {
        self.class() == ErrorClass::RateLimit
    }

    /// Short classification for failed invocation results
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimitExhausted { .. } => FailureKind::RateLimitExhausted,
            Self::MaxIterations(_) => FailureKind::MaxIterations,
            Self::DeadlineExceeded(_) => FailureKind::DeadlineExceeded,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Auth(_) => FailureKind::Auth,
            Self::Config(_) => FailureKind::Config,
            Self::Provider(_) | Self::ProviderUnavailable(_) | Self::RateLimited(_) => {
                FailureKind::Provider
            }
            _ => FailureKind::Internal,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::MaxIterations(_) => {
                "The request took too long to process. Please try a simpler query.".into()
            }
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::RateLimitExhausted { .. } => self.to_string(),
            Self::DeadlineExceeded(_) => {
                "The analysis did not finish in time. Please try again.".into()
            }
            Self::Cancelled => "The request was cancelled.".into(),
            Self::SessionNotFound(_) => "Conversation not found.".into(),
            Self::Auth(_) => "Authentication with the AI service failed.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_markers() {
        assert!(has_rate_limit_marker("HTTP 429 from upstream"));
        assert!(has_rate_limit_marker("Error code: RATE_LIMIT_exceeded"));
        assert!(has_rate_limit_marker("rate_limit_error"));
        assert!(has_rate_limit_marker("RESOURCE_EXHAUSTED: quota"));
        assert!(has_rate_limit_marker("Too Many Requests"));
        assert!(!has_rate_limit_marker("resource_exhausted"));
        assert!(!has_rate_limit_marker("401 Unauthorized"));
    }

    #[test]
    fn test_error_classification() {
        let throttled = AgentError::Provider("429 Too Many Requests: slow down".into());
        assert_eq!(throttled.class(), ErrorClass::RateLimit);
        assert_eq!(AgentError::RateLimited("quota".into()).class(), ErrorClass::RateLimit);

        let auth = AgentError::Auth("invalid api key".into());
        assert_eq!(auth.class(), ErrorClass::Other);

        let exhausted = AgentError::RateLimitExhausted { attempts: 3 };
        assert_eq!(exhausted.class(), ErrorClass::Other);
        assert_eq!(exhausted.kind(), FailureKind::RateLimitExhausted);
        assert!(exhausted.to_string().contains("after 3 attempts"));
    }
}
