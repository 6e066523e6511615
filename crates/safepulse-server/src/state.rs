//! Application State

use std::sync::Arc;

use agent_core::LlmProvider;
use crime_analysis::AnalysisService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider, for health and model listing
    pub provider: Arc<dyn LlmProvider>,

    /// Report analysis, general analysis and chat
    pub analysis: Arc<AnalysisService>,
}
