//! Core data models for the expense agent

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Category =================
//

/// Closed set of expense categories.
///
/// The wire names (and everything the classifier prompt speaks) are the
/// Portuguese labels; anything unrecognized maps to `Outros`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Alimentacao,
    Transporte,
    Saude,
    Lazer,
    Outros,
}

impl Category {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "alimentacao" => Category::Alimentacao,
            "transporte" => Category::Transporte,
            "saude" => Category::Saude,
            "lazer" => Category::Lazer,
            _ => Category::Outros,
        }
    }

    /// Fixed icon table used by replies and reports.
    pub fn icon(&self) -> &'static str {
        match self {
            Category::Alimentacao => "🍽️",
            Category::Transporte => "🚗",
            Category::Saude => "🏥",
            Category::Lazer => "🎬",
            Category::Outros => "📝",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Alimentacao => "alimentacao",
            Category::Transporte => "transporte",
            Category::Saude => "saude",
            Category::Lazer => "lazer",
            Category::Outros => "outros",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Expense Record =================
//

/// A persisted spending event.
///
/// `timestamp` is an ISO-8601 string set once at creation; it doubles as
/// the sort key for range queries. Records are immutable after creation —
/// there is no update or delete path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub timestamp: String,
    pub value: Decimal,
    pub category: Category,
    pub description: String,
    /// Display name of the reporting person.
    pub user_id: String,
    /// Originating WhatsApp address (audit-only).
    pub whatsapp_from: String,
}

//
// ================= Classified Intents =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPeriod {
    CurrentWeek,
    CurrentMonth,
    SpecificMonth,
}

impl QueryPeriod {
    pub fn parse(value: &str) -> Self {
        match value {
            "semana_atual" => QueryPeriod::CurrentWeek,
            "mes_especifico" => QueryPeriod::SpecificMonth,
            _ => QueryPeriod::CurrentMonth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    Individual,
    Family,
}

impl QueryScope {
    pub fn parse(value: &str) -> Self {
        match value {
            "familiar" => QueryScope::Family,
            _ => QueryScope::Individual,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseIntent {
    pub value: Decimal,
    pub category: Category,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryIntent {
    pub period: QueryPeriod,
    pub specific_month: Option<u32>,
    pub scope: QueryScope,
}

/// Classified purpose of an inbound message. Exactly one of three shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Expense(ExpenseIntent),
    Query(QueryIntent),
    Help,
}

//
// ================= Inbound Message =================
//

/// Parsed inbound webhook payload, gateway or direct test form.
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub text: String,
    pub from: String,
    pub profile_name: String,
    pub media_url: Option<String>,
    pub media_content_type: Option<String>,
    pub num_media: u32,
}

impl IncomingMessage {
    /// True iff the message carries audio media.
    pub fn is_audio(&self) -> bool {
        self.num_media > 0
            && self
                .media_content_type
                .as_deref()
                .map(|ct| ct.starts_with("audio/"))
                .unwrap_or(false)
    }
}
