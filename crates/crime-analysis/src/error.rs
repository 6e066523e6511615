//! Error Types for Crime Analysis

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid case number: {0}")]
    InvalidCaseNumber(String),

    #[error("Crime store error: {0}")]
    Store(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Whether the caller asked for something that does not exist
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Agent(AgentError::SessionNotFound(_))
        )
    }
}
