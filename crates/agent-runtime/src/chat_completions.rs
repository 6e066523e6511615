//! OpenAI-compatible Chat Completions Provider
//!
//! Implementation of `LlmProvider` for any endpoint speaking the
//! `/chat/completions` wire format: Groq by default, or a local Ollama
//! server through its `/v1` compatibility layer.

use std::collections::HashMap;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, TokenUsage},
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};

/// Groq's OpenAI-compatible API root
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Provider configuration
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// API credential, sent as a bearer token
    pub api_key: String,

    /// Default model identifier
    pub model: String,

    /// API root, without a trailing slash
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: agent_core::provider::DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Read `GROQ_API_KEY`, `GROQ_MODEL`, `LLM_BASE_URL` and `LLM_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::Config("GROQ_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);

        if let Ok(model) = std::env::var("GROQ_MODEL") {
            config = config.with_model(model);
        }
        if let Ok(base_url) = std::env::var("LLM_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Some(timeout) = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
        {
            config.timeout_secs = timeout;
        }

        Ok(config)
    }
}

/// Chat-completions LLM provider
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl ChatCompletionsProvider {
    /// Create from configuration
    pub fn from_config(config: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(bearer_headers(&config.api_key))
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(ProviderConfig::from_env()?)
    }

    /// Default model this provider was configured with
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url)
    }

    /// Convert agent messages to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        messages.iter().map(convert_message).collect()
    }

    fn build_request_body(
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Value {
        let mut body = json!({
            "model": options.model,
            "messages": Self::convert_messages(messages),
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });

        if let Some(obj) = body.as_object_mut() {
            if !options.stop_sequences.is_empty() {
                obj.insert("stop".into(), json!(options.stop_sequences));
            }

            if !tools.is_empty() {
                let defs: Vec<Value> = tools
                    .iter()
                    .map(|t| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": t.name,
                                "description": t.description,
                                "parameters": t.json_schema(),
                            }
                        })
                    })
                    .collect();
                obj.insert("tools".into(), Value::Array(defs));
                obj.insert("tool_choice".into(), json!("auto"));
            }
        }

        body
    }

    /// Convert a wire response to an agent completion
    fn convert_completion(response: ChatResponse, requested_model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("Response contained no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(WireToolCall::into_tool_call)
            .collect();

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: response.model.unwrap_or_else(|| requested_model.to_string()),
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.as_deref().and_then(FinishReason::parse),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url, error = %e, "Provider request failed");
                // Without the URL, so a port number cannot read as a status marker
                let e = e.without_url();
                if e.is_connect() || e.is_timeout() {
                    AgentError::ProviderUnavailable(e.to_string())
                } else {
                    AgentError::Provider(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_to_error(status, &body))
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        if self.config.base_url.contains("groq.com") {
            "groq"
        } else {
            "openai-compatible"
        }
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(provider = self.name(), error = %e, "Health check failed");
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let url = self.url("chat/completions");
        let body = Self::build_request_body(messages, tools, options);

        tracing::debug!(
            model = %options.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending chat completion"
        );

        let response = self.send(self.client.post(&url).json(&body), &url).await?;
        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("Invalid completion response: {e}")))?;

        Self::convert_completion(data, &options.model)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.url("models");
        let response = self.send(self.client.get(&url), &url).await?;
        let data: ModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("Invalid model list: {e}")))?;

        Ok(data
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                owned_by: m.owned_by,
                context_length: m.context_window,
            })
            .collect())
    }
}

fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(mut val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-success status. The status line stays in the text so that
/// throttling ("429 Too Many Requests") is classified as a rate limit.
fn status_to_error(status: StatusCode, body: &str) -> AgentError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AgentError::Auth(format!("{status}: {body}"))
        }
        _ => AgentError::Provider(format!("{status}: {body}")),
    }
}

fn convert_message(m: &Message) -> Value {
    match m.role {
        Role::System => json!({ "role": "system", "content": m.content }),
        Role::User => json!({ "role": "user", "content": m.content }),
        Role::Assistant if !m.tool_calls.is_empty() => {
            let calls: Vec<Value> = m
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": Value::Object(call.arguments.clone().into_iter().collect()).to_string(),
                        }
                    })
                })
                .collect();
            let content = if m.content.is_empty() {
                Value::Null
            } else {
                Value::String(m.content.clone())
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        Role::Assistant => json!({ "role": "assistant", "content": m.content }),
        // Fenced-protocol results have no call id to answer; they go back as context
        Role::Tool => match m.tool_call_id() {
            Some(id) => json!({ "role": "tool", "tool_call_id": id, "content": m.content }),
            None => json!({ "role": "user", "content": m.content }),
        },
    }
}

// Wire types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: Option<String>,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl WireToolCall {
    fn into_tool_call(self) -> ToolCall {
        let arguments = if self.function.arguments.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str::<HashMap<String, Value>>(&self.function.arguments)
                .unwrap_or_else(|e| {
                    tracing::warn!(
                        tool = %self.function.name,
                        error = %e,
                        "Tool call arguments are not a JSON object"
                    );
                    HashMap::new()
                })
        };

        ToolCall {
            name: self.function.name,
            arguments,
            id: self.id,
        }
    }
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<WireModel>,
}

#[derive(Deserialize)]
struct WireModel {
    id: String,
    owned_by: Option<String>,
    context_window: Option<u32>,
}
