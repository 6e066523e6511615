//! HTTP Handlers

use axum::{
    Json,
    extract::{FromRequestParts, Path, State},
    http::{StatusCode, request::Parts},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agent_core::{AgentRunResult, FailureKind, ModelInfo, Session, SessionId};
use crime_analysis::{AnalysisError, AnalysisRecord, AnalysisStatus};

use crate::state::AppState;

/// Header carrying the authenticated officer, set by the upstream gateway
pub const OFFICER_HEADER: &str = "x-officer-id";

pub type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub code: String,
}

impl ErrorResponse {
    fn reply(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
        (
            status,
            Json(Self {
                error: error.into(),
                details: None,
                code: code.into(),
            }),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeReportRequest {
    #[serde(default)]
    pub case_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralAnalysisRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub message: String,
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub session_id: String,
    pub title: String,
    pub message_count: usize,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for ConversationSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            title: session.title.clone(),
            message_count: session.message_count(),
            active: session.active,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub count: usize,
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub count: usize,
    pub results: Vec<AnalysisRecord>,
}

// ============================================================================
// Officer identity
// ============================================================================

/// The officer on whose behalf a request runs
#[derive(Clone, Debug)]
pub struct Officer(pub String);

impl<S> FromRequestParts<S> for Officer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OFFICER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .ok_or_else(|| {
                ErrorResponse::reply(
                    StatusCode::UNAUTHORIZED,
                    "Authentication credentials were not provided.",
                    "UNAUTHENTICATED",
                )
            })
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn service_error(err: &AnalysisError) -> ApiError {
    match err {
        AnalysisError::Validation(msg) => {
            ErrorResponse::reply(StatusCode::BAD_REQUEST, msg.clone(), "VALIDATION_ERROR")
        }
        AnalysisError::InvalidCaseNumber(_) => {
            ErrorResponse::reply(StatusCode::BAD_REQUEST, err.to_string(), "VALIDATION_ERROR")
        }
        AnalysisError::Agent(agent) if !err.is_not_found() => {
            tracing::error!(error = %agent, "Agent error");
            ErrorResponse::reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                agent.user_message(),
                "AGENT_ERROR",
            )
        }
        e if e.is_not_found() => ErrorResponse::reply(StatusCode::NOT_FOUND, e.to_string(), "NOT_FOUND"),
        e => {
            tracing::error!(error = %e, "Request failed");
            ErrorResponse::reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred.",
                "INTERNAL_ERROR",
            )
        }
    }
}

/// Failed agent outcome as a 500 carrying the reason
fn agent_failure(error: &str, outcome: Option<&AgentRunResult>) -> ApiError {
    let kind = outcome.and_then(|o| o.error_kind);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: error.into(),
            details: outcome.and_then(|o| o.error.clone()),
            code: failure_code(kind).into(),
        }),
    )
}

const fn failure_code(kind: Option<FailureKind>) -> &'static str {
    match kind {
        Some(FailureKind::RateLimitExhausted) => "RATE_LIMIT_EXHAUSTED",
        Some(FailureKind::MaxIterations) => "MAX_ITERATIONS",
        Some(FailureKind::DeadlineExceeded) => "DEADLINE_EXCEEDED",
        Some(FailureKind::Cancelled) => "CANCELLED",
        Some(FailureKind::Auth) => "PROVIDER_AUTH",
        Some(FailureKind::Config) => "PROVIDER_CONFIG",
        Some(FailureKind::Provider) => "PROVIDER_ERROR",
        Some(FailureKind::Internal) | None => "AGENT_ERROR",
    }
}

fn settled(record: AnalysisRecord) -> ApiResult<AnalysisRecord> {
    if record.status == AnalysisStatus::Failed {
        let outcome = AgentRunResult {
            success: false,
            response: None,
            error: record.error.clone(),
            error_kind: record.error_kind,
        };
        return Err(agent_failure("Analysis failed.", Some(&outcome)));
    }
    Ok(Json(record))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        provider_connected,
    })
}

/// Models offered by the provider
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Vec<ModelInfo>> {
    state.provider.list_models().await.map(Json).map_err(|e| {
        tracing::warn!(error = %e, "Model listing failed");
        ErrorResponse::reply(StatusCode::BAD_GATEWAY, e.user_message(), "PROVIDER_UNAVAILABLE")
    })
}

/// Deep-dive on one crime report
pub async fn analyze_report(
    State(state): State<AppState>,
    Officer(officer): Officer,
    Json(payload): Json<AnalyzeReportRequest>,
) -> ApiResult<AnalysisRecord> {
    let case_number = payload
        .case_number
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            ErrorResponse::reply(StatusCode::BAD_REQUEST, "case_number is required.", "VALIDATION_ERROR")
        })?;

    let record = state
        .analysis
        .analyze_report(&officer, case_number)
        .await
        .map_err(|e| service_error(&e))?;

    settled(record)
}

/// Analysis across all crime data
pub async fn general_analysis(
    State(state): State<AppState>,
    Officer(officer): Officer,
    Json(payload): Json<GeneralAnalysisRequest>,
) -> ApiResult<AnalysisRecord> {
    let record = state
        .analysis
        .general_analysis(&officer, payload.prompt.as_deref())
        .await
        .map_err(|e| service_error(&e))?;

    settled(record)
}

/// One chat turn, starting a conversation when no session is given
pub async fn chat(
    State(state): State<AppState>,
    Officer(officer): Officer,
    Json(payload): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            ErrorResponse::reply(StatusCode::BAD_REQUEST, "message is required.", "VALIDATION_ERROR")
        })?;
    let session_id = payload
        .session_id
        .filter(|s| !s.trim().is_empty())
        .map(SessionId::from_string);

    let turn = state
        .analysis
        .chat(&officer, message, session_id.as_ref())
        .await
        .map_err(|e| service_error(&e))?;

    match turn.outcome.response {
        Some(response) if turn.outcome.success => Ok(Json(ChatResponse {
            session_id: turn.session_id.to_string(),
            message: turn.message,
            response,
        })),
        _ => Err(agent_failure("Agent failed to respond.", Some(&turn.outcome))),
    }
}

/// Full history of one of the officer's conversations
pub async fn get_conversation(
    State(state): State<AppState>,
    Officer(officer): Officer,
    Path(session_id): Path<String>,
) -> ApiResult<Session> {
    state
        .analysis
        .conversation(&officer, &SessionId::from_string(session_id))
        .await
        .map(Json)
        .map_err(|e| service_error(&e))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Officer(officer): Officer,
) -> ApiResult<ConversationsResponse> {
    let sessions = state
        .analysis
        .conversations(&officer)
        .await
        .map_err(|e| service_error(&e))?;

    let conversations: Vec<ConversationSummary> = sessions.iter().map(Into::into).collect();
    Ok(Json(ConversationsResponse {
        count: conversations.len(),
        conversations,
    }))
}

pub async fn list_results(
    State(state): State<AppState>,
    Officer(officer): Officer,
) -> ApiResult<ResultsResponse> {
    let results = state
        .analysis
        .results(&officer)
        .await
        .map_err(|e| service_error(&e))?;

    Ok(Json(ResultsResponse {
        count: results.len(),
        results,
    }))
}

pub async fn get_result(
    State(state): State<AppState>,
    Officer(officer): Officer,
    Path(id): Path<u64>,
) -> ApiResult<AnalysisRecord> {
    state
        .analysis
        .result(&officer, id)
        .await
        .map(Json)
        .map_err(|e| service_error(&e))
}
