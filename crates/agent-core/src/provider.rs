//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for chat-completion backends (Groq, a local
//! OpenAI-compatible server, test doubles) so the agent works with any of
//! them without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = ChatCompletionsProvider::from_config(ProviderConfig::from_env()?)?;
//! let completion = provider.complete(&messages, &registry.schemas(), &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Default model identifier
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama-3.3-70b-versatile")
    pub model: String,

    /// Temperature for sampling (kept low for a factual, analytical tone)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

const fn default_temperature() -> f32 {
    0.3
}
const fn default_max_tokens() -> u32 {
    4096
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            stop_sequences: Vec::new(),
        }
    }
}

/// Response from one model turn
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text (may be empty when the turn only requests tools)
    pub content: String,

    /// Structured tool calls requested by the model
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// A plain text answer with no tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        }
    }

    /// A turn that only requests tools
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            finish_reason: Some(FinishReason::ToolUse),
            ..Default::default()
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

impl FinishReason {
    /// Map an OpenAI-style `finish_reason` string
    pub fn parse(reason: &str) -> Option<Self> {
        match reason {
            "stop" => Some(Self::Stop),
            "length" => Some(Self::Length),
            "tool_calls" | "function_call" => Some(Self::ToolUse),
            "content_filter" => Some(Self::ContentFilter),
            _ => None,
        }
    }
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub owned_by: Option<String>,
    pub context_length: Option<u32>,
}

/// Strategy trait for LLM providers
///
/// Implementations are stateless per call: configuration is fixed at
/// construction and every `complete` receives the full message sequence.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs and health output
    fn name(&self) -> &str;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Run one model turn over `messages`, offering `tools`
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!((opts.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 4096);
        assert_eq!(opts.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_finish_reason_parse() {
        assert_eq!(FinishReason::parse("tool_calls"), Some(FinishReason::ToolUse));
        assert_eq!(FinishReason::parse("stop"), Some(FinishReason::Stop));
        assert_eq!(FinishReason::parse("mystery"), None);
    }
}
