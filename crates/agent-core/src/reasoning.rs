//! Reasoning Loop
//!
//! Implements the tool-augmented agent runner. One invocation walks
//!
//! ```text
//! Idle -> Invoking -> (AwaitingToolResults -> Invoking)* -> Completed | Failed
//! ```
//!
//! and the whole walk is wrapped in the rate-limit [`RetryPolicy`]: a
//! throttled attempt restarts from the assembled message sequence.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, FailureKind, Result};
use crate::message::Message;
use crate::provider::{GenerationOptions, LlmProvider};
use crate::retry::RetryPolicy;
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt
    pub system_prompt: String,

    /// Maximum model turns per attempt before giving up
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Append the fenced-block tool protocol to the system prompt, for
    /// models without native tool calling
    pub inject_tool_descriptions: bool,

    /// Rate-limit retry policy
    pub retry: RetryPolicy,

    /// Overall deadline for one invocation, retries included
    pub deadline: Option<Duration>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: false,
            retry: RetryPolicy::default(),
            deadline: None,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = r"You are a helpful AI assistant.

Use the available tools whenever you need data to answer.
After receiving tool results, synthesize them into a helpful response.
If you can answer directly without tools, do so.
Be concise and accurate.";

/// Where an invocation currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Invoking { iteration: usize },
    AwaitingToolResults { iteration: usize, pending: usize },
    Completed,
    Failed,
}

impl RunState {
    fn advance(self, next: Self) -> Self {
        tracing::debug!(from = ?self, to = ?next, "Agent state transition");
        next
    }
}

/// Outcome of one agent invocation. Never an error: failures are data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRunResult {
    pub success: bool,

    /// Final answer, present iff `success`
    pub response: Option<String>,

    /// Failure details, present iff not `success`
    pub error: Option<String>,

    /// Failure classification, present iff not `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

impl AgentRunResult {
    pub fn completed(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(error: &AgentError) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

impl From<Result<String>> for AgentRunResult {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(response) => Self::completed(response),
            Err(err) => Self::failed(&err),
        }
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Build the full system prompt including tool descriptions
    fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
        }

        prompt
    }

    /// System prompt, replayable history (user/assistant only, original
    /// order) and the new user prompt.
    pub fn assemble_messages(&self, prompt: &str, history: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.build_system_prompt()));
        messages.extend(history.iter().filter(|m| m.role.is_replayable()).cloned());
        messages.push(Message::user(prompt));
        messages
    }

    /// Single-turn invocation: system prompt plus one user prompt
    pub async fn run(&self, prompt: &str) -> AgentRunResult {
        self.run_with_history(prompt, &[]).await
    }

    /// History-aware invocation
    pub async fn run_with_history(&self, prompt: &str, history: &[Message]) -> AgentRunResult {
        self.run_with_cancel(prompt, history, &CancellationToken::new())
            .await
    }

    /// History-aware invocation that stops when `cancel` fires or the
    /// configured deadline passes
    pub async fn run_with_cancel(
        &self,
        prompt: &str,
        history: &[Message],
        cancel: &CancellationToken,
    ) -> AgentRunResult {
        tracing::info!(
            model = %self.config.generation.model,
            history = history.len(),
            prompt = %preview(prompt, 80),
            "Running agent"
        );

        let messages = self.assemble_messages(prompt, history);

        let run = async {
            tokio::select! {
                () = cancel.cancelled() => Err(AgentError::Cancelled),
                result = self.execute(&messages, cancel) => result,
            }
        };

        let result = match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, run)
                .await
                .unwrap_or_else(|_| Err(AgentError::DeadlineExceeded(deadline))),
            None => run.await,
        };

        match &result {
            Ok(_) => tracing::info!("Agent completed successfully"),
            Err(e) => tracing::error!(kind = ?e.kind(), error = %e, "Agent failed"),
        }

        result.into()
    }

    /// Apply the retry policy around full attempts
    async fn execute(&self, messages: &[Message], cancel: &CancellationToken) -> Result<String> {
        self.config
            .retry
            .execute(cancel, |attempt| self.attempt(messages.to_vec(), attempt))
            .await
    }

    /// One attempt of the reasoning loop over a fresh copy of the messages
    async fn attempt(&self, mut messages: Vec<Message>, attempt: u32) -> Result<String> {
        let schemas = self.tools.schemas();
        let mut state = RunState::Idle;

        for iteration in 1..=self.config.max_iterations {
            state = state.advance(RunState::Invoking { iteration });

            let completion = match self
                .provider
                .complete(&messages, &schemas, &self.config.generation)
                .await
            {
                Ok(completion) => completion,
                Err(e) => {
                    state.advance(RunState::Failed);
                    return Err(e);
                }
            };

            let (calls, native): (Vec<ToolCall>, bool) = if completion.tool_calls.is_empty() {
                (self.parse_tool_call(&completion.content).into_iter().collect(), false)
            } else {
                (completion.tool_calls.clone(), true)
            };

            if calls.is_empty() {
                state.advance(RunState::Completed);
                return Ok(completion.content);
            }

            let calls: Vec<ToolCall> = calls.into_iter().map(ensure_call_id).collect();
            state = state.advance(RunState::AwaitingToolResults {
                iteration,
                pending: calls.len(),
            });
            tracing::debug!(attempt, iteration, tools = calls.len(), "Dispatching tool calls");

            let assistant = Message::assistant(completion.content);
            messages.push(if native {
                assistant.with_tool_calls(calls.clone())
            } else {
                assistant
            });

            // Calls from one turn are independent; all finish before the next turn
            let results = join_all(calls.iter().map(|call| self.execute_tool(call))).await;

            for result in results {
                let id = if native { result.id.clone() } else { None };
                messages.push(
                    Message::tool(Self::format_tool_result(&result), id).with_name(&result.name),
                );
            }
        }

        state.advance(RunState::Failed);
        Err(AgentError::MaxIterations(self.config.max_iterations))
    }

    /// Parse a fenced ```tool block from a model that has no native tool calling
    fn parse_tool_call(&self, content: &str) -> Option<ToolCall> {
        if !self.config.inject_tool_descriptions {
            return None;
        }

        let tool_start = "```tool";
        let tool_end = "```";

        let start_idx = content.find(tool_start)?;
        let after_marker = &content[start_idx + tool_start.len()..];
        let end_idx = after_marker.find(tool_end)?;
        let json_str = after_marker[..end_idx].trim();

        match serde_json::from_str::<ToolCall>(json_str) {
            Ok(call) => Some(call),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed tool block");
                None
            }
        }
    }

    /// Execute a tool call, turning every failure into result text
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, "Executing tool");

        match self.tools.execute(call).await {
            Ok(result) => result.with_id(call.id.clone()),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolResult::failure(call.name.clone(), format!("Error: {e}")).with_id(call.id.clone())
            }
        }
    }

    /// Format tool result for conversation
    fn format_tool_result(result: &ToolResult) -> String {
        if result.success {
            result.output.clone()
        } else {
            format!("[Tool '{}' failed]\n{}", result.name, result.output)
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

fn ensure_call_id(mut call: ToolCall) -> ToolCall {
    if call.id.is_none() {
        call.id = Some(format!("call_{}", uuid::Uuid::new_v4().simple()));
    }
    call
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<Arc<ToolRegistry>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: None,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    #[must_use]
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let tools = self.tools.unwrap_or_default();

        Ok(Agent::new(provider, tools, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::provider::{Completion, ModelInfo};
    use crate::tool::{ParameterSchema, Tool, ToolSchema};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Plays back scripted turns and records every request it sees.
    #[derive(Default)]
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<Completion>>>,
        requests: Mutex<Vec<Vec<Message>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Completion>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn requests(&self) -> Vec<Vec<Message>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(messages.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Completion::text("done")))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    struct CountTool;

    #[async_trait]
    impl Tool for CountTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "count_cases".into(),
                description: "Count cases in a district".into(),
                parameters: vec![ParameterSchema::required_string("district", "District")],
                category: None,
                has_side_effects: false,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            let district = call.str_arg("district").unwrap_or("unknown");
            Ok(ToolResult::success("count_cases", format!("{district}: 4 cases")))
        }
    }

    fn throttled() -> Result<Completion> {
        Err(AgentError::Provider("429 Too Many Requests".into()))
    }

    fn build_agent(provider: Arc<ScriptedProvider>) -> Agent {
        let mut tools = ToolRegistry::new();
        tools.register(CountTool);
        AgentBuilder::new()
            .provider(provider)
            .tools(Arc::new(tools))
            .system_prompt("You analyse crime data.")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_turn_answer() {
        let provider = ScriptedProvider::new(vec![Ok(Completion::text("All quiet."))]);
        let result = build_agent(provider.clone()).run("Anything new?").await;

        assert_eq!(result, AgentRunResult::completed("All quiet."));
        let sent = &provider.requests()[0];
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[1].content, "Anything new?");
    }

    #[tokio::test]
    async fn test_history_assembly_has_four_messages() {
        let provider = ScriptedProvider::new(vec![Ok(Completion::text("Kampala."))]);
        let history = vec![Message::user("hi"), Message::assistant("hello")];

        let result = build_agent(provider.clone())
            .run_with_history("Which district has most robberies?", &history)
            .await;
        assert!(result.success);

        let sent = &provider.requests()[0];
        let shape: Vec<(Role, &str)> = sent.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(shape.len(), 4);
        assert_eq!(shape[0].0, Role::System);
        assert_eq!(shape[1], (Role::User, "hi"));
        assert_eq!(shape[2], (Role::Assistant, "hello"));
        assert_eq!(shape[3], (Role::User, "Which district has most robberies?"));
    }

    #[test]
    fn test_assembly_is_deterministic_and_drops_non_chat_roles() {
        let agent = build_agent(ScriptedProvider::new(Vec::new()));
        let history = vec![
            Message::user("hi"),
            Message::tool("raw tool output", None),
            Message::system("stale instructions"),
            Message::assistant("hello"),
        ];

        let first = agent.assemble_messages("next", &history);
        let second = agent.assemble_messages("next", &history);

        let shape = |msgs: &[Message]| -> Vec<(Role, String)> {
            msgs.iter().map(|m| (m.role, m.content.clone())).collect()
        };
        assert_eq!(shape(&first), shape(&second));
        assert_eq!(first.len(), 4);
        assert_eq!(first[1].content, "hi");
        assert_eq!(first[2].content, "hello");
    }

    #[tokio::test]
    async fn test_tool_loop_feeds_results_back() {
        let call = ToolCall::new("count_cases")
            .with_arg("district", "Wakiso")
            .with_id("call_1");
        let provider = ScriptedProvider::new(vec![
            Ok(Completion::tool_calls(vec![call])),
            Ok(Completion::text("Wakiso has 4 cases.")),
        ]);

        let result = build_agent(provider.clone()).run("How many in Wakiso?").await;
        assert_eq!(result.response.as_deref(), Some("Wakiso has 4 cases."));

        let second = &provider.requests()[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, Role::Assistant);
        assert_eq!(second[2].tool_calls.len(), 1);
        assert_eq!(second[3].role, Role::Tool);
        assert_eq!(second[3].tool_call_id(), Some("call_1"));
        assert_eq!(second[3].content, "Wakiso: 4 cases");
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_the_step_not_the_run() {
        let provider = ScriptedProvider::new(vec![
            Ok(Completion::tool_calls(vec![ToolCall::new("drop_tables")])),
            Ok(Completion::text("I could not use that tool.")),
        ]);

        let result = build_agent(provider.clone()).run("Do it").await;
        assert!(result.success);

        let tool_msg = &provider.requests()[1][3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert!(tool_msg.content.contains("Tool not found: drop_tables"));
        assert!(tool_msg.tool_call_id().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_twice_then_success() {
        let provider = ScriptedProvider::new(vec![
            throttled(),
            throttled(),
            Ok(Completion::text("Recovered.")),
        ]);
        let start = tokio::time::Instant::now();

        let result = build_agent(provider.clone()).run("Summarise").await;

        assert_eq!(result.response.as_deref(), Some("Recovered."));
        assert_eq!(provider.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausted_after_three_attempts() {
        let provider = ScriptedProvider::new(vec![
            throttled(),
            throttled(),
            throttled(),
            Ok(Completion::text("never")),
        ]);

        let result = build_agent(provider.clone()).run("Summarise").await;

        assert!(!result.success);
        assert!(result.response.is_none());
        assert_eq!(result.error_kind, Some(FailureKind::RateLimitExhausted));
        assert!(result.error.unwrap().contains("after 3 attempts"));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_rate_limit_error_fails_immediately() {
        let provider = ScriptedProvider::new(vec![
            Err(AgentError::Auth("invalid api key".into())),
            Ok(Completion::text("never")),
        ]);
        let start = tokio::time::Instant::now();

        let result = build_agent(provider.clone()).run("Summarise").await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(FailureKind::Auth));
        assert_eq!(provider.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_restarts_from_assembled_messages() {
        let call = ToolCall::new("count_cases").with_arg("district", "Mukono");
        let provider = ScriptedProvider::new(vec![
            Ok(Completion::tool_calls(vec![call])),
            throttled(),
            Ok(Completion::text("fresh start")),
        ]);

        let result = build_agent(provider.clone()).run("Mukono?").await;
        assert!(result.success);

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].len(), 4);
        assert_eq!(requests[2].len(), 2);
    }

    #[tokio::test]
    async fn test_max_iterations_guard() {
        let looping: Vec<Result<Completion>> = (0..5)
            .map(|_| {
                Ok(Completion::tool_calls(vec![
                    ToolCall::new("count_cases").with_arg("district", "Gulu"),
                ]))
            })
            .collect();
        let provider = ScriptedProvider::new(looping);
        let agent = AgentBuilder::new()
            .provider(provider.clone())
            .tools(build_agent(ScriptedProvider::new(Vec::new())).tools.clone())
            .max_iterations(3)
            .build()
            .unwrap();

        let result = agent.run("loop forever").await;

        assert_eq!(result.error_kind, Some(FailureKind::MaxIterations));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_fenced_tool_block_fallback() {
        let provider = ScriptedProvider::new(vec![
            Ok(Completion::text(
                "Checking.\n```tool\n{\"tool\": \"count_cases\", \"arguments\": {\"district\": \"Jinja\"}}\n```",
            )),
            Ok(Completion::text("Jinja has 4 cases.")),
        ]);
        let mut config = build_agent(ScriptedProvider::new(Vec::new())).config().clone();
        config.inject_tool_descriptions = true;
        let mut tools = ToolRegistry::new();
        tools.register(CountTool);
        let agent = Agent::new(provider.clone(), Arc::new(tools), config);

        let result = agent.run("Jinja?").await;
        assert_eq!(result.response.as_deref(), Some("Jinja has 4 cases."));

        let requests = provider.requests();
        assert!(requests[0][0].content.contains("## Available Tools"));
        let tool_msg = &requests[1][3];
        assert_eq!(tool_msg.content, "Jinja: 4 cases");
        assert!(tool_msg.tool_call_id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_and_cancellation() {
        let provider = ScriptedProvider::new(vec![throttled(), throttled(), throttled()]);
        let agent = AgentBuilder::new()
            .provider(provider)
            .deadline(Duration::from_secs(10))
            .build()
            .unwrap();

        let result = agent.run("slow").await;
        assert_eq!(result.error_kind, Some(FailureKind::DeadlineExceeded));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = agent.run_with_cancel("stop", &[], &cancel).await;
        assert_eq!(result.error_kind, Some(FailureKind::Cancelled));
    }
}
