use std::sync::Arc;
use tracing::info;
use whatsapp_expense_agent::{
    agent::ExpenseAgent,
    api::start_server,
    config::Config,
    storage::build_store,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;

    info!("🚀 WhatsApp Expense Agent - Webhook Server");
    info!("📍 Port: {}", config.port);

    let store = build_store(&config);
    let agent = Arc::new(ExpenseAgent::from_config(&config, store));

    info!("✅ Agent initialized");
    info!("📡 Starting webhook server...");

    start_server(agent, config.port).await?;

    Ok(())
}
