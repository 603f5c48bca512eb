use conversation_orchestrator::{
    agent::{ChatOrchestrator, ChatTurnRequest},
    backend::Backends,
    config::OrchestratorConfig,
    llm::MockLlmClient,
    memory::TieredMemoryManager,
    models::{CategorySpend, FinancialContext},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Scripted replies for the demo conversation, in order
const SCRIPT: &[&str] = &[
    "Este mês você recebeu R$ 8.000 e gastou R$ 5.200. Mercado está em R$ 1.250, \
     acima do orçamento de R$ 1.000. Quer que eu crie um orçamento para mercado?",
    "Feito! Sugiro R$ 1.100 para mercado e R$ 600 para restaurante em março.",
    r#"{"success": true, "transaction": {"amount": 50.0, "type": "expense", "category": "Mercado"}}"#,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    info!("Conversation Orchestrator demo starting");

    let config = OrchestratorConfig::default();
    let llm = Arc::new(
        MockLlmClient::new("Certo!").with_script(SCRIPT.iter().map(|reply| Some(reply.to_string()))),
    );
    let backends = Backends::in_memory();

    let orchestrator = ChatOrchestrator::new(&config, llm, backends.conversation, backends.memory);

    let user_id = Uuid::new_v4();
    let financial_context = FinancialContext {
        month: Some(3),
        year: Some(2025),
        income: 8000.0,
        expenses: 5200.0,
        balance: 2800.0,
        by_category: vec![CategorySpend {
            name: "Mercado".to_string(),
            spent: 1250.0,
            budget: Some(1000.0),
        }],
        ..Default::default()
    };

    for message in ["como estou esse mês?", "sim", "50 mercado", "ganho 8000 por mês"] {
        let response = orchestrator
            .handle_turn(ChatTurnRequest {
                user_id,
                message: Some(message.to_string()),
                financial_context: financial_context.clone(),
                ..Default::default()
            })
            .await?;

        println!("\n=== TURN {} ===", response.state.turn_count);
        println!("Usuário: {}", message);
        println!(
            "Agent: {} ({} / {})",
            response.persona, response.decision.model_tier, response.decision.model_id
        );
        if let Some(intent) = &response.resolved_intent {
            println!("Resolved: {} (confirmed: {:?})", intent.action, intent.confirmed);
        }
        println!("Zeni: {}", response.response);
        println!("Pending action: {}", response.state.pending_action);
    }

    let snapshot = orchestrator.memory().assemble(user_id, "").await;
    println!("\n=== MEMORY ===");
    println!("{}", TieredMemoryManager::format_for_prompt(&snapshot));

    Ok(())
}
