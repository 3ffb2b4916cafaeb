//! Movie Agent - conversational movie expert over an agent-to-agent event stream
//!
//! A Rust backend implementing a task lifecycle state machine that answers
//! movie questions with a Gemini model and TMDB search tools.

mod a2a;
mod api;
mod config;
mod llm;
mod runtime;
mod state_machine;
mod system_prompt;
mod tools;

use api::{create_router, AppState};
use config::AgentConfig;
use llm::{GeminiService, LoggingClient};
use runtime::{InMemoryCancellations, InMemoryContextStore, LlmClient, TurnProcessor};
use std::net::SocketAddr;
use std::sync::Arc;
use tools::{movie_tools, TmdbClient};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AgentConfig::from_env()?;

    // Model client and tools
    let gemini = GeminiService::new(config.gemini_api_key.clone(), &config.model, None)?;
    let llm_client: Arc<dyn LlmClient> = Arc::new(LoggingClient::new(gemini));
    let tmdb = Arc::new(TmdbClient::new(&config.tmdb_api_key)?);
    tracing::info!(model = %config.model, "Model client initialized");

    let processor = TurnProcessor::new(
        Arc::new(InMemoryContextStore::new()),
        Arc::new(InMemoryCancellations::new()),
        llm_client,
        movie_tools(tmdb),
    )
    .with_settings(config.turns.clone());
    tracing::info!(settings = ?config.turns, "Turn processor ready");

    // Create application state
    let state = AppState::new(processor, a2a::movie_agent_card(&config.public_url));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Movie agent listening on {}", addr);
    tracing::info!(
        "Agent card at {}.well-known/agent.json",
        config.public_url
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
