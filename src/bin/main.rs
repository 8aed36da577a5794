//! Run a single message through the agent from the command line.
//!
//! Useful for local testing without the webhook server:
//!   agent "gastei 40 reais em comida"

use std::sync::Arc;
use tracing::info;
use whatsapp_expense_agent::{
    agent::ExpenseAgent,
    config::Config,
    models::IncomingMessage,
    storage::build_store,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = Config::from_env()?;

    let text = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let text = if text.is_empty() {
        "quanto gastei este mês?".to_string()
    } else {
        text
    };

    info!("Sending message through the agent: {}", text);

    let store = build_store(&config);
    let agent = Arc::new(ExpenseAgent::from_config(&config, store));

    let message = IncomingMessage {
        text,
        from: "cli:local".to_string(),
        profile_name: std::env::var("USER").unwrap_or_else(|_| "desconhecido".to_string()),
        ..Default::default()
    };

    let reply = agent.handle_message(message).await;

    println!("\n=== AGENT REPLY ===");
    println!("{}", reply);

    Ok(())
}
