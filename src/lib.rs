//! WhatsApp Expense Agent
//!
//! A WhatsApp-based expense tracker that:
//! - Receives gateway webhooks (text or voice notes)
//! - Classifies intent and extracts fields with the Gemini API
//! - Persists expenses and answers period reports with AI insights
//! - Replies in the gateway's TwiML wire format
//!
//! PIPELINE:
//! WEBHOOK → PARSE → [TRANSCRIBE] → CLASSIFY → {SAVE | REPORT | HELP} → REPLY

pub mod agent;
pub mod aggregate;
pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gemini;
pub mod insight;
pub mod models;
pub mod period;
pub mod report;
pub mod storage;
pub mod transcription;

pub use error::Result;

// Re-export common types
pub use config::Config;
pub use models::*;
