use conversation_orchestrator::{
    agent::ChatOrchestrator,
    api::start_server,
    backend::build_backends,
    config::OrchestratorConfig,
    llm::{GeminiClient, LlmClient, OfflineLlmClient},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Loads .env as well
    let config = OrchestratorConfig::from_env();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Conversation Orchestrator - API Server");
    info!("Port: {}", api_port);

    let llm: Arc<dyn LlmClient> = match &config.llm_api_key {
        Some(key) => Arc::new(GeminiClient::new(key.clone())?),
        None => {
            warn!("GEMINI_API_KEY not set, replies come from the offline client");
            Arc::new(OfflineLlmClient::new(
                "Estou em modo offline no momento. Configure GEMINI_API_KEY para respostas reais.",
            ))
        }
    };

    let backends = build_backends(config.database_url.as_deref());
    info!(
        backend = backends.kind,
        fast_model = %config.router.fast_model,
        capable_model = %config.router.capable_model,
        "Orchestrator configured"
    );

    let orchestrator = Arc::new(ChatOrchestrator::new(
        &config,
        llm,
        backends.conversation,
        backends.memory,
    ));

    info!("Starting API server...");

    start_server(orchestrator, api_port).await?;

    Ok(())
}
