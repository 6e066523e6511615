//! SafePulse HTTP Server
//!
//! Axum-based server exposing crime report analysis, general analysis
//! and multi-turn analyst chat over the crime analysis agent.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{CancellationToken, LlmProvider};
use agent_runtime::ChatCompletionsProvider;
use crime_analysis::{AnalysisService, CrimeStore, MemoryCrimeStore};

use crate::config::ServerConfig;
use crate::handlers::{
    analyze_report, chat, general_analysis, get_conversation, get_result, health_check,
    list_conversations, list_models, list_results,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Initialize LLM provider
    let provider = Arc::new(ChatCompletionsProvider::from_env()?);
    match provider.health_check().await {
        Ok(true) => tracing::info!(provider = provider.name(), model = provider.model(), "Connected to LLM provider"),
        Ok(false) | Err(_) => {
            tracing::warn!(provider = provider.name(), "LLM provider not reachable - analyses will fail");
        }
    }

    // Crime data
    let crimes: Arc<dyn CrimeStore> = match &config.crime_data_path {
        Some(path) => Arc::new(MemoryCrimeStore::from_json_file(path).await?),
        None => {
            tracing::warn!("CRIME_DATA_PATH not set - serving the built-in sample dataset");
            Arc::new(MemoryCrimeStore::sample())
        }
    };

    let shutdown = CancellationToken::new();
    let analysis = AnalysisService::new(
        provider.clone(),
        crimes,
        config.agent_config(provider.model()),
    )?
    .with_shutdown(shutdown.clone());

    let tools = analysis.agent().tools();
    tracing::info!(count = tools.len(), tools = ?tools.names(), "Registered crime tools");

    let state = AppState {
        provider,
        analysis: Arc::new(analysis),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "SafePulse server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

/// Wait for ctrl-c, then stop in-flight agent runs
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
    shutdown.cancel();
}

fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))
        // Analysis
        .route("/api/analysis/analyze-report", post(analyze_report))
        .route("/api/analysis/general", post(general_analysis))
        .route("/api/analysis/results", get(list_results))
        .route("/api/analysis/results/{id}", get(get_result))
        // Chat
        .route("/api/analysis/chat", post(chat))
        .route("/api/analysis/chat/{session_id}", get(get_conversation))
        .route("/api/analysis/conversations", get(list_conversations))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
