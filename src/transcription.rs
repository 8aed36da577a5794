//! Audio transcription
//!
//! Downloads the voice note from the messaging gateway (credentialed) and
//! hands the bytes to Gemini for transcription. Failures are logged and
//! collapse to `None` — the caller answers with a fixed apology instead.

use crate::config::Config;
use crate::error::AgentError;
use crate::gemini::GeminiClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribed text for the media URL, or `None` when anything fails.
    async fn transcribe(&self, media_url: &str) -> Option<String>;
}

pub struct TwilioAudioTranscriber {
    http: reqwest::Client,
    gemini: Arc<GeminiClient>,
    account_sid: String,
    auth_token: String,
}

impl TwilioAudioTranscriber {
    pub fn new(config: &Config, gemini: Arc<GeminiClient>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            gemini,
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
        }
    }

    async fn convert_to_text(&self, media_url: &str) -> crate::Result<String> {
        info!("Downloading audio from: {}", media_url);

        let response = self
            .http
            .get(media_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("audio/ogg")
            .to_string();

        let audio = response.bytes().await?;
        info!("Audio downloaded, size: {} bytes", audio.len());

        let transcription = self.gemini.transcribe_audio(&audio, &content_type).await?;

        if transcription.is_empty() {
            return Err(AgentError::TranscriptionError(
                "No transcription found in Gemini response".to_string(),
            ));
        }

        Ok(transcription)
    }
}

#[async_trait::async_trait]
impl Transcriber for TwilioAudioTranscriber {
    async fn transcribe(&self, media_url: &str) -> Option<String> {
        match self.convert_to_text(media_url).await {
            Ok(text) => {
                info!("Audio transcribed successfully: {}", text);
                Some(text)
            }
            Err(e) => {
                warn!("Error converting audio to text: {}", e);
                None
            }
        }
    }
}
