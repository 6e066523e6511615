//! # agent-runtime
//!
//! Runtime providers for the agent system.
//!
//! ## Providers
//!
//! - **Chat Completions** (default): any OpenAI-compatible endpoint. Groq
//!   out of the box; point `LLM_BASE_URL` at `http://localhost:11434/v1`
//!   for a local Ollama.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{ChatCompletionsProvider, ProviderConfig};
//!
//! let provider = ChatCompletionsProvider::from_config(ProviderConfig::from_env()?)?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

pub mod chat_completions;

pub use chat_completions::{ChatCompletionsProvider, ProviderConfig};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentBuilder, AgentError, LlmProvider, Message, Result, Role, Session, Tool,
    ToolRegistry,
};
