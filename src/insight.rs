//! Insight Narrator
//!
//! Builds a data-grounded analysis prompt from the aggregated spending plus
//! a window of the most recent raw records, and asks Gemini for narrative
//! insights. Generative prose, so it runs at a higher temperature than the
//! classifier. Any failure yields the static fallback sentence.

use crate::aggregate::aggregate;
use crate::gemini::{GeminiClient, GenerationOptions};
use crate::models::ExpenseRecord;
use crate::report::format_brl;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const INSIGHT_FALLBACK: &str =
    "💡 Continue registrando suas despesas para obter insights personalizados da IA!";

#[async_trait::async_trait]
pub trait InsightNarrator: Send + Sync {
    /// Narrative insight over the period's records, or the fallback text.
    async fn narrate(
        &self,
        records: &[ExpenseRecord],
        title: &str,
        family: bool,
        period_label: &str,
    ) -> String;
}

pub struct GeminiNarrator {
    client: Arc<GeminiClient>,
}

impl GeminiNarrator {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl InsightNarrator for GeminiNarrator {
    async fn narrate(
        &self,
        records: &[ExpenseRecord],
        title: &str,
        family: bool,
        period_label: &str,
    ) -> String {
        debug!("Generating insight for {}", title);

        let prompt = build_insights_prompt(records, family, period_label);

        let options = GenerationOptions {
            temperature: 0.7,
            max_output_tokens: 500,
        };

        match self.client.generate(&prompt, options).await {
            Ok(insight) if !insight.is_empty() => {
                info!(
                    "Generated detailed insight: {}...",
                    insight.chars().take(200).collect::<String>()
                );
                insight
            }
            Ok(_) => INSIGHT_FALLBACK.to_string(),
            Err(e) => {
                warn!("Error generating AI insight: {}", e);
                INSIGHT_FALLBACK.to_string()
            }
        }
    }
}

fn build_insights_prompt(records: &[ExpenseRecord], family: bool, period_label: &str) -> String {
    let summary = aggregate(records, family);

    let mut categories = summary.by_category.clone();
    categories.sort_by(|a, b| b.1.total.cmp(&a.1.total));

    let categories_text = categories
        .iter()
        .map(|(category, entry)| {
            format!(
                "- {}: {} ({:.1}%) - {} despesas",
                category,
                format_brl(entry.total),
                summary.percent_of(entry.total),
                entry.count
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut users_text = String::new();
    if let Some(by_user) = summary.by_user.as_ref().filter(|users| users.len() > 1) {
        let mut users = by_user.clone();
        users.sort_by(|a, b| b.1.cmp(&a.1));

        users_text.push_str("\n\nGastos por pessoa:\n");
        users_text.push_str(
            &users
                .iter()
                .map(|(user, total)| {
                    format!(
                        "- {}: {} ({:.1}%)",
                        user,
                        format_brl(*total),
                        summary.percent_of(*total)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    // Window of the most recent 10 records for context.
    let mut recent_text = String::new();
    if !records.is_empty() {
        let window = &records[records.len().saturating_sub(10)..];
        recent_text.push_str("\n\nÚltimas despesas registradas:\n");
        recent_text.push_str(
            &window
                .iter()
                .map(|record| {
                    format!(
                        "- {}: {} - {}...",
                        record.category,
                        format_brl(record.value),
                        record.description.chars().take(30).collect::<String>()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    format!(
        r#"Analise detalhadamente os dados de despesas e forneça insights úteis e práticos em português brasileiro:

Período analisado: {}
Total gasto: {}
Número de despesas: {}
Tipo de análise: {}

Distribuição por categoria:
{}{}{}

Como especialista em finanças pessoais, forneça 3 insights práticos e específicos (máximo 4 linhas cada):

1. **Padrão Principal:** Qual o padrão mais importante identificado nos gastos?
2. **Oportunidade de Economia:** Onde há maior potencial de redução de custos?
3. **Recomendação Estratégica:** Qual ação concreta recomenda para otimizar os gastos?

Só traga os insights, sem conclusão ou resumo, seja prático e focado nos dados apresentados. Use emojis relevantes."#,
        period_label,
        format_brl(summary.total),
        summary.record_count,
        if family { "Família" } else { "Individual" },
        categories_text,
        users_text,
        recent_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use rust_decimal::Decimal;

    fn record(value: i64, category: Category, user: &str, description: &str) -> ExpenseRecord {
        ExpenseRecord {
            timestamp: "2026-08-06T12:00:00".to_string(),
            value: Decimal::from(value),
            category,
            description: description.to_string(),
            user_id: user.to_string(),
            whatsapp_from: "whatsapp:+5511999990000".to_string(),
        }
    }

    #[test]
    fn test_prompt_grounds_the_data() {
        let records = vec![
            record(90, Category::Alimentacao, "Ana", "mercado da semana"),
            record(10, Category::Transporte, "Ana", "uber"),
        ];

        let prompt = build_insights_prompt(&records, false, "mês de agosto");
        assert!(prompt.contains("Período analisado: mês de agosto"));
        assert!(prompt.contains("Total gasto: R$ 100.00"));
        assert!(prompt.contains("Número de despesas: 2"));
        assert!(prompt.contains("Tipo de análise: Individual"));
        assert!(prompt.contains("- alimentacao: R$ 90.00 (90.0%) - 1 despesas"));
        assert!(prompt.contains("mercado da semana"));
        assert!(!prompt.contains("Gastos por pessoa"));
    }

    #[test]
    fn test_family_prompt_lists_users() {
        let records = vec![
            record(60, Category::Alimentacao, "Ana", "almoço"),
            record(40, Category::Lazer, "Bia", "cinema"),
        ];

        let prompt = build_insights_prompt(&records, true, "semana atual");
        assert!(prompt.contains("Tipo de análise: Família"));
        assert!(prompt.contains("Gastos por pessoa:"));
        assert!(prompt.contains("- Ana: R$ 60.00 (60.0%)"));
    }

    #[test]
    fn test_recent_window_keeps_last_ten() {
        let records: Vec<_> = (0..15)
            .map(|i| record(i, Category::Outros, "Ana", &format!("gasto {}", i)))
            .collect();

        let prompt = build_insights_prompt(&records, false, "mês de agosto");
        assert!(!prompt.contains("gasto 4..."));
        assert!(prompt.contains("gasto 5..."));
        assert!(prompt.contains("gasto 14..."));
    }

    #[test]
    fn test_long_descriptions_are_truncated() {
        let long = "a".repeat(80);
        let records = vec![record(10, Category::Outros, "Ana", &long)];

        let prompt = build_insights_prompt(&records, false, "mês de agosto");
        assert!(prompt.contains(&format!("{}...", "a".repeat(30))));
        assert!(!prompt.contains(&"a".repeat(31)));
    }
}
