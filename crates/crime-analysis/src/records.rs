//! Analysis Records
//!
//! Persistence for analysis requests and their outcomes, scoped to the
//! officer who asked.

use std::sync::atomic::{AtomicU64, Ordering};

use agent_core::AgentRunResult;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{AnalysisError, Result};
use crate::model::{AnalysisRecord, AnalysisStatus, CaseNumber};

/// Analysis record store trait
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Record a new request in `processing`
    async fn start(
        &self,
        requested_by: &str,
        case_number: Option<CaseNumber>,
        prompt: String,
    ) -> Result<AnalysisRecord>;

    /// Settle a request from the agent's outcome
    async fn finish(&self, id: u64, outcome: &AgentRunResult) -> Result<AnalysisRecord>;

    /// Requests by `officer`, newest first
    async fn list(&self, officer: &str) -> Result<Vec<AnalysisRecord>>;

    /// One request, only if `officer` made it
    async fn get(&self, officer: &str, id: u64) -> Result<Option<AnalysisRecord>>;
}

/// In-memory analysis store
pub struct MemoryAnalysisStore {
    records: RwLock<Vec<AnalysisRecord>>,
    next_id: AtomicU64,
}

impl Default for MemoryAnalysisStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn start(
        &self,
        requested_by: &str,
        case_number: Option<CaseNumber>,
        prompt: String,
    ) -> Result<AnalysisRecord> {
        let record = AnalysisRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            requested_by: requested_by.to_string(),
            case_number,
            prompt,
            summary: String::new(),
            status: AnalysisStatus::Processing,
            error: None,
            error_kind: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn finish(&self, id: u64, outcome: &AgentRunResult) -> Result<AnalysisRecord> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AnalysisError::NotFound(format!("Analysis result {id} not found.")))?;

        if outcome.success {
            record.summary = outcome.response.clone().unwrap_or_default();
            record.status = AnalysisStatus::Completed;
            record.completed_at = Some(Utc::now());
        } else {
            record.status = AnalysisStatus::Failed;
            record.error = outcome.error.clone();
            record.error_kind = outcome.error_kind;
        }

        Ok(record.clone())
    }

    async fn list(&self, officer: &str) -> Result<Vec<AnalysisRecord>> {
        let records = self.records.read().await;
        let mut result: Vec<AnalysisRecord> = records
            .iter()
            .filter(|r| r.requested_by == officer)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    async fn get(&self, officer: &str, id: u64) -> Result<Option<AnalysisRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.id == id && r.requested_by == officer)
            .cloned())
    }
}
