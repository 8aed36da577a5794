//! Period Resolver
//!
//! Turns a classified query intent plus the current instant into an
//! absolute date range and the human-readable title/label used by reports.

use crate::models::{QueryIntent, QueryPeriod};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Portuguese month name, 1-based. Out-of-range months get a placeholder
/// rather than failing.
pub fn month_name(month: u32) -> &'static str {
    if (1..=12).contains(&month) {
        MONTH_NAMES[(month - 1) as usize]
    } else {
        "Mês"
    }
}

/// An absolute, resolved reporting window.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Report header, e.g. "📅 *Relatório de Junho*".
    pub title: String,
    /// Prose label for the narrator, e.g. "mês de junho".
    pub label: String,
}

impl ResolvedPeriod {
    /// Range bounds in the ISO-8601 shape records are keyed by.
    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Resolve a query intent against the current instant.
pub fn resolve_period(query: &QueryIntent, now: NaiveDateTime) -> ResolvedPeriod {
    match query.period {
        QueryPeriod::CurrentWeek => {
            let monday = now.date() - Duration::days(now.weekday().num_days_from_monday() as i64);
            ResolvedPeriod {
                start: monday.and_hms_opt(0, 0, 0).expect("midnight is valid"),
                end: now,
                title: "📅 *Relatório da Semana*".to_string(),
                label: "semana atual".to_string(),
            }
        }

        QueryPeriod::SpecificMonth if valid_month(query.specific_month) => {
            let month = query.specific_month.expect("checked by valid_month");
            let start = NaiveDate::from_ymd_opt(now.year(), month, 1)
                .expect("first of a valid month")
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid");

            // Last instant of the month: one second before the first instant
            // of the following month, rolling the year for December.
            let (next_year, next_month) = if month == 12 {
                (now.year() + 1, 1)
            } else {
                (now.year(), month + 1)
            };
            let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
                .expect("first of the following month")
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid")
                - Duration::seconds(1);

            let name = month_name(month);
            ResolvedPeriod {
                start,
                end,
                title: format!("📅 *Relatório de {}*", name),
                label: format!("mês de {}", name.to_lowercase()),
            }
        }

        // Current month, and the fallthrough for a specific-month query
        // that carries no usable month number.
        _ => {
            let start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
                .expect("first of the current month")
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid");

            let name = month_name(now.month());
            ResolvedPeriod {
                start,
                end: now,
                title: format!("📅 *Relatório de {}*", name),
                label: format!("mês de {}", name.to_lowercase()),
            }
        }
    }
}

fn valid_month(month: Option<u32>) -> bool {
    matches!(month, Some(m) if (1..=12).contains(&m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryScope;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn query(period: QueryPeriod, specific_month: Option<u32>) -> QueryIntent {
        QueryIntent {
            period,
            specific_month,
            scope: QueryScope::Individual,
        }
    }

    #[test]
    fn test_current_week_starts_on_most_recent_monday() {
        // 2026-08-06 is a Thursday; the week began Monday the 3rd.
        let now = at(2026, 8, 6, 15, 30, 0);
        let resolved = resolve_period(&query(QueryPeriod::CurrentWeek, None), now);

        assert_eq!(resolved.start, at(2026, 8, 3, 0, 0, 0));
        assert_eq!(resolved.end, now);
        assert_eq!(resolved.title, "📅 *Relatório da Semana*");
        assert_eq!(resolved.label, "semana atual");
    }

    #[test]
    fn test_week_start_on_a_monday_is_that_monday() {
        let now = at(2026, 8, 3, 9, 0, 0);
        let resolved = resolve_period(&query(QueryPeriod::CurrentWeek, None), now);
        assert_eq!(resolved.start, at(2026, 8, 3, 0, 0, 0));
    }

    #[test]
    fn test_current_month_runs_from_first_to_now() {
        let now = at(2026, 8, 6, 12, 0, 0);
        let resolved = resolve_period(&query(QueryPeriod::CurrentMonth, None), now);

        assert_eq!(resolved.start, at(2026, 8, 1, 0, 0, 0));
        assert_eq!(resolved.end, now);
        assert_eq!(resolved.title, "📅 *Relatório de Agosto*");
        assert_eq!(resolved.label, "mês de agosto");
    }

    #[test]
    fn test_specific_month_covers_whole_month() {
        let now = at(2026, 8, 6, 12, 0, 0);
        let resolved = resolve_period(&query(QueryPeriod::SpecificMonth, Some(6)), now);

        assert_eq!(resolved.start, at(2026, 6, 1, 0, 0, 0));
        assert_eq!(resolved.end, at(2026, 6, 30, 23, 59, 59));
        assert_eq!(resolved.title, "📅 *Relatório de Junho*");
        assert_eq!(resolved.label, "mês de junho");
    }

    #[test]
    fn test_december_rolls_into_next_year_minus_one_second() {
        let now = at(2026, 8, 6, 12, 0, 0);
        let resolved = resolve_period(&query(QueryPeriod::SpecificMonth, Some(12)), now);

        assert_eq!(resolved.start, at(2026, 12, 1, 0, 0, 0));
        assert_eq!(resolved.end, at(2026, 12, 31, 23, 59, 59));
    }

    #[test]
    fn test_specific_month_without_number_falls_back_to_current_month() {
        let now = at(2026, 8, 6, 12, 0, 0);
        let resolved = resolve_period(&query(QueryPeriod::SpecificMonth, None), now);

        assert_eq!(resolved.start, at(2026, 8, 1, 0, 0, 0));
        assert_eq!(resolved.end, now);
    }

    #[test]
    fn test_out_of_range_month_falls_back_to_current_month() {
        let now = at(2026, 8, 6, 12, 0, 0);
        let resolved = resolve_period(&query(QueryPeriod::SpecificMonth, Some(13)), now);
        assert_eq!(resolved.start, at(2026, 8, 1, 0, 0, 0));
    }

    #[test]
    fn test_month_name_placeholder() {
        assert_eq!(month_name(1), "Janeiro");
        assert_eq!(month_name(12), "Dezembro");
        assert_eq!(month_name(0), "Mês");
        assert_eq!(month_name(13), "Mês");
    }

    #[test]
    fn test_iso_bounds_sort_lexicographically() {
        let now = at(2026, 8, 6, 12, 0, 0);
        let resolved = resolve_period(&query(QueryPeriod::CurrentMonth, None), now);
        assert!(resolved.start_iso() < resolved.end_iso());
        assert_eq!(resolved.start_iso(), "2026-08-01T00:00:00");
    }
}
