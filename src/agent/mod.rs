//! Message orchestrator — the agent's state chain
//!
//! RECEIVE → PARSE → [TRANSCRIBE] → EXTRACT TEXT → CLASSIFY →
//! {SAVE EXPENSE | RUN REPORT | HELP} → REPLY
//!
//! Every inbound message runs this chain sequentially to completion. The
//! single top-level failure boundary lives in `handle_message`: any error
//! escaping the chain becomes the fixed apology reply, with full detail
//! only in the server logs.

use crate::aggregate::aggregate;
use crate::classifier::{GeminiClassifier, IntentClassifier};
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::insight::{GeminiNarrator, InsightNarrator};
use crate::models::{ExpenseIntent, ExpenseRecord, IncomingMessage, Intent, QueryIntent, QueryScope};
use crate::period::resolve_period;
use crate::report::{format_brl, format_report};
use crate::storage::ExpenseStore;
use crate::transcription::{Transcriber, TwilioAudioTranscriber};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const APOLOGY_REPLY: &str = "❌ Ops! Algo deu errado. Tente novamente em alguns segundos.";

pub const AUDIO_APOLOGY_REPLY: &str = "🎤 Desculpe, não consegui entender o áudio. Tente enviar \
     uma mensagem de texto ou grave novamente com mais clareza.";

pub const EMPTY_INPUT_REPLY: &str =
    "❌ Não recebi nenhuma mensagem de texto ou áudio válido. Tente novamente!";

pub const NEGATIVE_VALUE_REPLY: &str = "❌ O valor da despesa não pode ser negativo. Me conte \
     quanto você gastou, por exemplo: \"gastei 50 reais no almoço\".";

const HELP_REPLY: &str = r#"🤖 *Olá! Sou seu assistente de despesas com IA Gemini!*

🧠 *Inteligência Artificial Avançada:*
• Entendo linguagem natural e áudios 🎤
• Classifico automaticamente suas despesas
• Gero insights personalizados

📝 *Exemplos de mensagens (texto ou áudio):*
• "gastei uns 40 reais em comida hoje"
• "paguei 120 no supermercado"
• "almoço custou 25 reais"
• "uber foi 35 reais"

📊 *Para relatórios inteligentes:*
• "quanto gastei este mês?"
• "relatório da semana"
• "gastos de junho"
• "quanto a família gastou?"

🎯 *Categorias automáticas com IA:*
🍽️ Alimentação • 🚗 Transporte
🏥 Saúde • 🎬 Lazer • 📝 Outros

🎤 *Novidade:* Agora você pode mandar áudios também!
"#;

const DEFAULT_USER: &str = "desconhecido";

/// The expense agent: classification, persistence and reporting behind a
/// single `handle_message` entry point.
pub struct ExpenseAgent {
    classifier: Arc<dyn IntentClassifier>,
    transcriber: Arc<dyn Transcriber>,
    narrator: Arc<dyn InsightNarrator>,
    store: Arc<dyn ExpenseStore>,
}

impl ExpenseAgent {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        transcriber: Arc<dyn Transcriber>,
        narrator: Arc<dyn InsightNarrator>,
        store: Arc<dyn ExpenseStore>,
    ) -> Self {
        Self {
            classifier,
            transcriber,
            narrator,
            store,
        }
    }

    /// Wire the Gemini-backed components from configuration.
    pub fn from_config(config: &Config, store: Arc<dyn ExpenseStore>) -> Self {
        let gemini = Arc::new(GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_url.clone(),
        ));

        Self::new(
            Arc::new(GeminiClassifier::new(gemini.clone())),
            Arc::new(TwilioAudioTranscriber::new(config, gemini.clone())),
            Arc::new(GeminiNarrator::new(gemini)),
            store,
        )
    }

    /// Run one message through the chain. Never fails: any internal error
    /// is logged and converted into the fixed apology reply.
    pub async fn handle_message(&self, message: IncomingMessage) -> String {
        match self.process(message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Error handling message: {}", e);
                APOLOGY_REPLY.to_string()
            }
        }
    }

    async fn process(&self, mut message: IncomingMessage) -> crate::Result<String> {
        if message.is_audio() {
            let media_url = message.media_url.clone().unwrap_or_default();
            match self.transcriber.transcribe(&media_url).await {
                Some(text) if !text.trim().is_empty() => message.text = text,
                _ => return Ok(AUDIO_APOLOGY_REPLY.to_string()),
            }
        }

        let text = message.text.trim().to_string();
        if text.is_empty() {
            return Ok(EMPTY_INPUT_REPLY.to_string());
        }

        let intent = self.classifier.classify(&text).await;
        info!("Classified intent: {:?}", intent);

        let now = chrono::Local::now().naive_local();
        match intent {
            Intent::Expense(expense) => self.save_expense(&message, expense, now).await,
            Intent::Query(query) => self.run_report(&message, query, now).await,
            Intent::Help => Ok(HELP_REPLY.to_string()),
        }
    }

    async fn save_expense(
        &self,
        message: &IncomingMessage,
        expense: ExpenseIntent,
        now: NaiveDateTime,
    ) -> crate::Result<String> {
        if expense.value < Decimal::ZERO {
            warn!("Rejecting negative expense value: {}", expense.value);
            return Ok(NEGATIVE_VALUE_REPLY.to_string());
        }

        let record = ExpenseRecord {
            timestamp: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            value: expense.value,
            category: expense.category,
            description: expense.description,
            user_id: display_name(message),
            whatsapp_from: message.from.clone(),
        };

        self.store.save(&record).await?;
        info!("Expense saved: {} {}", record.timestamp, record.value);

        // Distinct marker when the text came out of a voice note.
        let audio_indicator = if message.num_media > 0 { "🎤➡️📝 " } else { "" };

        Ok(format!(
            r#"✅ {}Despesa registrada com IA!

📊 *Detalhes:*
• Valor: {}
• Categoria: {} {}
• Descrição: {}
• Data: {}

🤖 *Processado automaticamente pela IA Gemini*
💬 *Dica:* Envie áudios ou textos - eu entendo os dois!"#,
            audio_indicator,
            format_brl(record.value),
            record.category.icon(),
            record.category,
            record.description,
            now.format("%d/%m/%Y %H:%M"),
        ))
    }

    async fn run_report(
        &self,
        message: &IncomingMessage,
        query: QueryIntent,
        now: NaiveDateTime,
    ) -> crate::Result<String> {
        let period = resolve_period(&query, now);
        let family = query.scope == QueryScope::Family;

        let user = display_name(message);
        let user_filter = if family { None } else { Some(user.as_str()) };

        let records = match self
            .store
            .search(&period.start_iso(), &period.end_iso(), user_filter)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!("Error searching expenses: {}", e);
                Vec::new()
            }
        };

        if records.is_empty() {
            return Ok(format!(
                "{}\n\n❌ Nenhuma despesa encontrada neste período.\n\n💡 *Dica:* Registre gastos \
                 por texto ou áudio: \"gastei 50 reais no almoço\"",
                period.title
            ));
        }

        let summary = aggregate(&records, family);
        let report = format_report(&summary, &period.title, family);

        let insight = self
            .narrator
            .narrate(&records, &period.title, family, &period.label)
            .await;

        Ok(format!(
            "{}\n\n🤖 *Insight Inteligente (IA Gemini):*\n{}",
            report, insight
        ))
    }
}

fn display_name(message: &IncomingMessage) -> String {
    let name = message.profile_name.trim();
    if name.is_empty() {
        DEFAULT_USER.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, QueryPeriod};
    use crate::storage::InMemoryExpenseStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FixedClassifier(Intent);

    #[async_trait::async_trait]
    impl IntentClassifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Intent {
            self.0.clone()
        }
    }

    struct FixedTranscriber(Option<String>);

    #[async_trait::async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _media_url: &str) -> Option<String> {
            self.0.clone()
        }
    }

    struct CountingNarrator {
        called: AtomicBool,
    }

    impl CountingNarrator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                called: AtomicBool::new(false),
            })
        }
    }

    #[async_trait::async_trait]
    impl InsightNarrator for CountingNarrator {
        async fn narrate(
            &self,
            _records: &[ExpenseRecord],
            _title: &str,
            _family: bool,
            _period_label: &str,
        ) -> String {
            self.called.store(true, Ordering::SeqCst);
            "insight de teste".to_string()
        }
    }

    fn agent_with(
        intent: Intent,
        transcription: Option<String>,
    ) -> (ExpenseAgent, Arc<InMemoryExpenseStore>, Arc<CountingNarrator>) {
        let store = Arc::new(InMemoryExpenseStore::new());
        let narrator = CountingNarrator::new();
        let agent = ExpenseAgent::new(
            Arc::new(FixedClassifier(intent)),
            Arc::new(FixedTranscriber(transcription)),
            narrator.clone(),
            store.clone(),
        );
        (agent, store, narrator)
    }

    fn text_message(body: &str) -> IncomingMessage {
        IncomingMessage {
            text: body.to_string(),
            from: "whatsapp:+5511999990000".to_string(),
            profile_name: "Ana".to_string(),
            ..Default::default()
        }
    }

    fn audio_message() -> IncomingMessage {
        IncomingMessage {
            text: String::new(),
            from: "whatsapp:+5511999990000".to_string(),
            profile_name: "Ana".to_string(),
            media_url: Some("https://api.twilio.com/media/1".to_string()),
            media_content_type: Some("audio/ogg".to_string()),
            num_media: 1,
        }
    }

    fn food_expense(value: i64) -> Intent {
        Intent::Expense(ExpenseIntent {
            value: Decimal::from(value),
            category: Category::Alimentacao,
            description: "comida".to_string(),
        })
    }

    #[tokio::test]
    async fn test_expense_is_saved_and_confirmed() {
        let (agent, store, _) = agent_with(food_expense(40), None);

        let reply = agent
            .handle_message(text_message("gastei 40 reais em comida"))
            .await;

        assert!(reply.contains("R$ 40.00"));
        assert!(reply.contains("🍽️"));
        assert!(reply.contains("Despesa registrada"));
        assert!(!reply.contains("🎤➡️📝"));
        assert_eq!(store.len().await, 1);

        let saved = store
            .search("0000-01-01T00:00:00", "9999-12-31T23:59:59", None)
            .await
            .unwrap();
        assert_eq!(saved[0].value, Decimal::from(40));
        assert_eq!(saved[0].category, Category::Alimentacao);
        assert_eq!(saved[0].user_id, "Ana");
    }

    #[tokio::test]
    async fn test_audio_expense_carries_the_voice_marker() {
        let (agent, store, _) = agent_with(
            food_expense(25),
            Some("almoço custou 25 reais".to_string()),
        );

        let reply = agent.handle_message(audio_message()).await;
        assert!(reply.contains("🎤➡️📝"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_transcription_short_circuits_without_saving() {
        let (agent, store, narrator) = agent_with(food_expense(25), None);

        let reply = agent.handle_message(audio_message()).await;
        assert_eq!(reply, AUDIO_APOLOGY_REPLY);
        assert!(store.is_empty().await);
        assert!(!narrator.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_text_short_circuits() {
        let (agent, store, _) = agent_with(food_expense(25), None);

        let reply = agent.handle_message(text_message("   ")).await;
        assert_eq!(reply, EMPTY_INPUT_REPLY);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_negative_value_is_rejected_without_saving() {
        let (agent, store, _) = agent_with(food_expense(-10), None);

        let reply = agent.handle_message(text_message("gastei -10")).await;
        assert_eq!(reply, NEGATIVE_VALUE_REPLY);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_report_without_records_skips_the_narrator() {
        let query = Intent::Query(QueryIntent {
            period: QueryPeriod::CurrentMonth,
            specific_month: None,
            scope: QueryScope::Individual,
        });
        let (agent, _, narrator) = agent_with(query, None);

        let reply = agent
            .handle_message(text_message("quanto gastei este mês?"))
            .await;

        assert!(reply.contains("❌ Nenhuma despesa encontrada neste período."));
        assert!(!narrator.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_report_with_records_appends_the_insight() {
        let query = Intent::Query(QueryIntent {
            period: QueryPeriod::CurrentMonth,
            specific_month: None,
            scope: QueryScope::Individual,
        });
        let (agent, store, narrator) = agent_with(query, None);

        let now = chrono::Local::now().naive_local();
        store
            .save(&ExpenseRecord {
                timestamp: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
                value: Decimal::from(80),
                category: Category::Alimentacao,
                description: "mercado".to_string(),
                user_id: "Ana".to_string(),
                whatsapp_from: "whatsapp:+5511999990000".to_string(),
            })
            .await
            .unwrap();

        let reply = agent
            .handle_message(text_message("quanto gastei este mês?"))
            .await;

        assert!(reply.contains("💰 *Total:* R$ 80.00"));
        assert!(reply.contains("🤖 *Insight Inteligente (IA Gemini):*"));
        assert!(reply.contains("insight de teste"));
        assert!(narrator.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_family_report_sees_other_users() {
        let query = Intent::Query(QueryIntent {
            period: QueryPeriod::CurrentMonth,
            specific_month: None,
            scope: QueryScope::Family,
        });
        let (agent, store, _) = agent_with(query, None);

        let now = chrono::Local::now().naive_local();
        for (user, value) in [("Bia", 60), ("Caio", 40)] {
            store
                .save(&ExpenseRecord {
                    timestamp: format!("{}", now.format("%Y-%m-%dT%H:%M:%S")),
                    value: Decimal::from(value),
                    category: Category::Lazer,
                    description: "cinema".to_string(),
                    user_id: user.to_string(),
                    whatsapp_from: "whatsapp:+5511888880000".to_string(),
                })
                .await
                .unwrap();
        }

        let reply = agent
            .handle_message(text_message("quanto a família gastou?"))
            .await;

        assert!(reply.contains("👥 *Por Pessoa:*"));
        assert!(reply.contains("Bia"));
        assert!(reply.contains("Caio"));
    }

    #[tokio::test]
    async fn test_help_intent_returns_the_capability_text() {
        let (agent, _, _) = agent_with(Intent::Help, None);

        let reply = agent.handle_message(text_message("oi")).await;
        assert!(reply.contains("assistente de despesas"));
        assert!(reply.contains("quanto gastei este mês?"));
    }

    #[tokio::test]
    async fn test_unknown_sender_defaults_to_desconhecido() {
        let (agent, store, _) = agent_with(food_expense(10), None);

        let mut message = text_message("gastei 10");
        message.profile_name = "  ".to_string();
        agent.handle_message(message).await;

        let saved = store
            .search("0000-01-01T00:00:00", "9999-12-31T23:59:59", None)
            .await
            .unwrap();
        assert_eq!(saved[0].user_id, "desconhecido");
    }
}
