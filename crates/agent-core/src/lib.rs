//! # agent-core
//!
//! Core agent logic with provider-agnostic LLM abstraction, a typed tool
//! registry and conversation sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └──────┬──────┘  └─────────────┘  └─────────────────────┘  │
//! │         │                                                    │
//! │  ┌──────┴──────┐  ┌─────────────┐                           │
//! │  │ RetryPolicy │  │SessionStore │                           │
//! │  └─────────────┘  └─────────────┘                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between Groq, a local
//! OpenAI-compatible server, or a scripted test double without changing
//! agent logic.

pub mod provider;
pub mod tool;
pub mod reasoning;
pub mod message;
pub mod error;
pub mod retry;
pub mod session;

pub use error::{AgentError, ErrorClass, FailureKind, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider, ModelInfo};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, AgentRunResult};
pub use retry::RetryPolicy;
pub use session::{MemorySessionStore, Session, SessionGuard, SessionId, SessionStore};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};

pub use tokio_util::sync::CancellationToken;
