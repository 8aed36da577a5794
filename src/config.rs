//! Process configuration
//!
//! Loaded once at startup from the environment (optionally via .env),
//! then passed read-only into each component's constructor.

use crate::error::AgentError;
use crate::Result;

const DEFAULT_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_url: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    /// Postgres connection string; when absent the in-memory store is used.
    pub database_url: Option<String>,
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `GEMINI_API_KEY` is required; Twilio credentials are only needed for
    /// the audio path and default to empty strings so text-only deployments
    /// keep working.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AgentError::ConfigError("GEMINI_API_KEY not set".to_string()))?;

        let port = std::env::var("PORT")
            .or_else(|_| std::env::var("API_PORT"))
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| AgentError::ConfigError(format!("Invalid port: {}", e)))?;

        Ok(Self {
            gemini_api_key,
            gemini_url: std::env::var("GEMINI_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_URL.to_string()),
            twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            database_url: std::env::var("DATABASE_URL").ok(),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_an_error() {
        std::env::remove_var("GEMINI_API_KEY");

        let result = Config::from_env();
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("GEMINI_API_KEY"));
    }
}
