//! Analysis Service
//!
//! Orchestrates the crime agent for the three request shapes: a
//! single-report deep dive, a corpus-wide analysis and a multi-turn chat.
//! Persistence of analysis records and chat messages happens here; the
//! agent itself never writes anything.

use std::sync::Arc;

use agent_core::{
    Agent, AgentBuilder, AgentConfig, AgentRunResult, CancellationToken, LlmProvider,
    MemorySessionStore, Message, Session, SessionId, SessionStore,
};

use crate::error::{AnalysisError, Result};
use crate::model::{AnalysisRecord, CaseNumber};
use crate::prompts::{GENERAL_ANALYSIS_PROMPT, SingleReportPrompt, system_prompt};
use crate::records::{AnalysisStore, MemoryAnalysisStore};
use crate::store::CrimeStore;
use crate::svckit::crime_tools;

/// Sessions listed per officer
const CONVERSATION_LIST_LIMIT: usize = 100;

/// Outcome of one chat turn
#[derive(Clone, Debug)]
pub struct ChatTurn {
    pub session_id: SessionId,
    pub message: String,
    pub outcome: AgentRunResult,
}

pub struct AnalysisService {
    agent: Agent,
    crimes: Arc<dyn CrimeStore>,
    sessions: Arc<dyn SessionStore>,
    analyses: Arc<dyn AnalysisStore>,
    shutdown: CancellationToken,
}

impl AnalysisService {
    /// Build the crime agent over `crimes` with in-memory session and
    /// analysis stores. The system prompt is generated from the registered
    /// tools; the rest of `config` is used as given.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        crimes: Arc<dyn CrimeStore>,
        config: AgentConfig,
    ) -> Result<Self> {
        let tools = crime_tools(crimes.clone());
        let prompt = system_prompt(&tools);

        let agent = AgentBuilder::new()
            .provider(provider)
            .tools(Arc::new(tools))
            .config(config)
            .system_prompt(prompt)
            .build()?;

        Ok(Self {
            agent,
            crimes,
            sessions: Arc::new(MemorySessionStore::new()),
            analyses: Arc::new(MemoryAnalysisStore::new()),
            shutdown: CancellationToken::new(),
        })
    }

    /// In-flight agent runs stop when `token` is cancelled
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub const fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Deep-dive on one report. A failed agent run is returned as a
    /// `failed` record, not an error.
    pub async fn analyze_report(&self, officer: &str, case_number: &str) -> Result<AnalysisRecord> {
        let case_number = case_number.trim();
        if case_number.is_empty() {
            return Err(AnalysisError::Validation("case_number is required.".into()));
        }
        let not_found = || AnalysisError::NotFound(format!("Crime report {case_number} not found."));

        let case: CaseNumber = case_number.parse().map_err(|_| not_found())?;
        let report = self.crimes.get(&case).await?.ok_or_else(not_found)?;

        let prompt = SingleReportPrompt::from_report(&report).render();
        let record = self
            .analyses
            .start(officer, Some(case.clone()), prompt.clone())
            .await?;

        tracing::info!(officer, case_number = %case, analysis_id = record.id, "Analyzing crime report");
        let outcome = self.agent.run_with_cancel(&prompt, &[], &self.shutdown).await;
        let record = self.analyses.finish(record.id, &outcome).await?;

        if outcome.success {
            self.crimes.mark_analyzed(&case).await?;
            tracing::info!(case_number = %case, "Analysis completed");
        }

        Ok(record)
    }

    /// Corpus-wide analysis with `prompt`, or the general template when
    /// none is given
    pub async fn general_analysis(&self, officer: &str, prompt: Option<&str>) -> Result<AnalysisRecord> {
        let prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(GENERAL_ANALYSIS_PROMPT);

        let record = self.analyses.start(officer, None, prompt.to_string()).await?;
        tracing::info!(officer, analysis_id = record.id, "Running general analysis");

        let outcome = self.agent.run_with_cancel(prompt, &[], &self.shutdown).await;
        self.analyses.finish(record.id, &outcome).await
    }

    /// One chat turn. Without a session id a new session is started,
    /// titled after the message.
    pub async fn chat(
        &self,
        officer: &str,
        message: &str,
        session_id: Option<&SessionId>,
    ) -> Result<ChatTurn> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AnalysisError::Validation("message is required.".into()));
        }

        let session = match session_id {
            Some(id) => self
                .sessions
                .get(id, officer)
                .await?
                .ok_or_else(|| AnalysisError::NotFound("Conversation not found.".into()))?,
            None => self.sessions.create(officer, message).await?,
        };
        let id = session.id().clone();

        // Held until the reply is stored so turns on one session never interleave
        let _guard = self.sessions.lock(&id).await;

        let history = self.sessions.messages(&id).await?;
        self.sessions.append(&id, Message::user(message)).await?;

        tracing::info!(officer, session_id = %id, history = history.len(), "Chat turn");
        let outcome = self
            .agent
            .run_with_cancel(message, &history, &self.shutdown)
            .await;

        if let Some(response) = &outcome.response {
            self.sessions
                .append(&id, Message::assistant(response.clone()))
                .await?;
        }

        Ok(ChatTurn {
            session_id: id,
            message: message.to_string(),
            outcome,
        })
    }

    /// Full conversation, if `officer` owns it
    pub async fn conversation(&self, officer: &str, session_id: &SessionId) -> Result<Session> {
        self.sessions
            .get(session_id, officer)
            .await?
            .ok_or_else(|| AnalysisError::NotFound("Conversation not found.".into()))
    }

    /// The officer's sessions, most recently active first
    pub async fn conversations(&self, officer: &str) -> Result<Vec<Session>> {
        Ok(self.sessions.list(officer, CONVERSATION_LIST_LIMIT).await?)
    }

    pub async fn results(&self, officer: &str) -> Result<Vec<AnalysisRecord>> {
        self.analyses.list(officer).await
    }

    pub async fn result(&self, officer: &str, id: u64) -> Result<AnalysisRecord> {
        self.analyses
            .get(officer, id)
            .await?
            .ok_or_else(|| AnalysisError::NotFound("Analysis result not found.".into()))
    }
}
