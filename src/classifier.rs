//! Intent Classifier
//!
//! Sends the raw message text to Gemini with a fixed instruction prompt and
//! parses the JSON reply into one of three intents: expense, query or help.
//! Any failure — transport, non-2xx, bad JSON, missing fields — downgrades
//! silently to `Intent::Help`; classification never surfaces an error.

use crate::gemini::{GeminiClient, GenerationOptions};
use crate::models::{Category, ExpenseIntent, Intent, QueryIntent, QueryPeriod, QueryScope};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait::async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Intent;
}

/// Gemini-backed classifier.
pub struct GeminiClassifier {
    client: Arc<GeminiClient>,
}

impl GeminiClassifier {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl IntentClassifier for GeminiClassifier {
    async fn classify(&self, text: &str) -> Intent {
        let prompt = build_classification_prompt(text);

        let options = GenerationOptions {
            temperature: 0.1,
            max_output_tokens: 200,
        };

        match self.client.generate(&prompt, options).await {
            Ok(response) => {
                info!("Gemini interpretation: {}", response.trim());
                parse_intent(&response, text)
            }
            Err(e) => {
                warn!("Could not interpret message with Gemini, using fallback: {}", e);
                Intent::Help
            }
        }
    }
}

fn build_classification_prompt(text: &str) -> String {
    format!(
        r#"Analise a seguinte mensagem de WhatsApp e determine se é:
1. DESPESA: usuário relatando um gasto
2. CONSULTA: usuário pedindo relatório/informações sobre gastos
3. AJUDA: mensagem que não se encaixa nas anteriores

Mensagem: "{}"

Se for DESPESA, extraia:
- Valor gasto (apenas número, sem texto)
- Categoria (alimentacao, transporte, saude, lazer, outros)
- Descrição resumida do gasto

Se for CONSULTA, identifique:
- Período solicitado (semana_atual, mes_atual, mes_especifico)
- Se é consulta individual ou familiar
- Mês específico se mencionado (1-12)

Responda APENAS com um JSON válido no formato:

Para DESPESA:
{{
    "tipo": "despesa",
    "valor": 50.0,
    "categoria": "alimentacao",
    "descricao": "almoço no restaurante"
}}

Para CONSULTA:
{{
    "tipo": "consulta",
    "periodo": "mes_atual",
    "escopo": "individual",
    "mes_especifico": null
}}

Para AJUDA:
{{
    "tipo": "ajuda"
}}

IMPORTANTE: Responda APENAS com o JSON, sem texto adicional."#,
        text
    )
}

/// Wire shape of the classifier reply. Fields are lenient so one odd value
/// degrades to a default instead of discarding the whole classification.
#[derive(Debug, Deserialize)]
#[serde(tag = "tipo", rename_all = "lowercase")]
enum WireIntent {
    Despesa {
        valor: Option<Decimal>,
        categoria: Option<String>,
        descricao: Option<String>,
    },
    Consulta {
        periodo: Option<String>,
        escopo: Option<String>,
        mes_especifico: Option<u32>,
    },
    Ajuda,
}

/// Parse a Gemini reply into an `Intent`, falling back to `Help`.
///
/// `original_text` seeds the expense description when the model omits one.
pub fn parse_intent(response: &str, original_text: &str) -> Intent {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let wire: WireIntent = match serde_json::from_str(cleaned) {
        Ok(wire) => wire,
        Err(e) => {
            warn!("Error parsing Gemini JSON response: {}", e);
            return Intent::Help;
        }
    };

    match wire {
        WireIntent::Despesa {
            valor,
            categoria,
            descricao,
        } => Intent::Expense(ExpenseIntent {
            value: valor.unwrap_or_default(),
            category: Category::parse(categoria.as_deref().unwrap_or("")),
            description: descricao.unwrap_or_else(|| original_text.to_string()),
        }),
        WireIntent::Consulta {
            periodo,
            escopo,
            mes_especifico,
        } => Intent::Query(QueryIntent {
            period: QueryPeriod::parse(periodo.as_deref().unwrap_or("")),
            specific_month: mes_especifico,
            scope: QueryScope::parse(escopo.as_deref().unwrap_or("")),
        }),
        WireIntent::Ajuda => Intent::Help,
    }
}
