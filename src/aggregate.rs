//! Aggregator
//!
//! Single pass over expense records accumulating the grand total plus
//! per-category (and optionally per-user) running sums. Grouping preserves
//! first-seen order; sorting for display is the formatter's job.

use crate::models::{Category, ExpenseRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTotal {
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpendingSummary {
    pub total: Decimal,
    pub record_count: usize,
    /// Per-category sums and counts, in first-seen order.
    pub by_category: Vec<(Category, CategoryTotal)>,
    /// Per-user sums, only when a user breakdown was requested.
    pub by_user: Option<Vec<(String, Decimal)>>,
}

impl SpendingSummary {
    /// Share of the grand total, as a percentage. Defined as 0 when the
    /// total is 0.
    pub fn percent_of(&self, amount: Decimal) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        (amount / self.total * Decimal::from(100))
            .to_f64()
            .unwrap_or(0.0)
    }
}

pub fn aggregate(records: &[ExpenseRecord], include_user_breakdown: bool) -> SpendingSummary {
    let mut total = Decimal::ZERO;
    let mut by_category: Vec<(Category, CategoryTotal)> = Vec::new();
    let mut by_user: Vec<(String, Decimal)> = Vec::new();

    for record in records {
        total += record.value;

        match by_category
            .iter_mut()
            .find(|(category, _)| *category == record.category)
        {
            Some((_, entry)) => {
                entry.total += record.value;
                entry.count += 1;
            }
            None => by_category.push((
                record.category,
                CategoryTotal {
                    total: record.value,
                    count: 1,
                },
            )),
        }

        if include_user_breakdown {
            match by_user.iter_mut().find(|(user, _)| *user == record.user_id) {
                Some((_, sum)) => *sum += record.value,
                None => by_user.push((record.user_id.clone(), record.value)),
            }
        }
    }

    SpendingSummary {
        total,
        record_count: records.len(),
        by_category,
        by_user: include_user_breakdown.then_some(by_user),
    }
}
