//! Report Formatter
//!
//! Renders an aggregated spending summary into the WhatsApp reply body:
//! title, grand total, record count, category breakdown with fixed icons,
//! and a per-person breakdown for family queries. Breakdowns are sorted
//! descending by sum; ties keep first-seen order (stable sort).

use crate::aggregate::SpendingSummary;
use rust_decimal::Decimal;

/// Fixed two-decimal BRL rendering, no thousands separators.
pub fn format_brl(value: Decimal) -> String {
    format!("R$ {:.2}", value.round_dp(2))
}

pub fn format_report(
    summary: &SpendingSummary,
    title: &str,
    include_user_breakdown: bool,
) -> String {
    let mut report = format!("{}\n\n", title);

    report.push_str(&format!("💰 *Total:* {}\n", format_brl(summary.total)));
    report.push_str(&format!(
        "📊 *{} despesas registradas*\n\n",
        summary.record_count
    ));

    report.push_str("📋 *Por Categoria:*\n");
    let mut categories = summary.by_category.clone();
    categories.sort_by(|a, b| b.1.total.cmp(&a.1.total));
    for (category, entry) in &categories {
        report.push_str(&format!(
            "{} {}: {} ({:.1}%)\n",
            category.icon(),
            category,
            format_brl(entry.total),
            summary.percent_of(entry.total)
        ));
    }

    if include_user_breakdown {
        if let Some(by_user) = summary.by_user.as_ref().filter(|users| users.len() > 1) {
            let mut users = by_user.clone();
            users.sort_by(|a, b| b.1.cmp(&a.1));

            report.push_str("\n👥 *Por Pessoa:*\n");
            for (user, total) in &users {
                report.push_str(&format!(
                    "• {}: {} ({:.1}%)\n",
                    user,
                    format_brl(*total),
                    summary.percent_of(*total)
                ));
            }
        }
    }

    report.trim_end().to_string()
}
