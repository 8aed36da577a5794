//! Gemini API client
//!
//! Shared by the intent classifier, the insight narrator and the audio
//! transcriber. Uses a long-lived reqwest::Client for connection pooling.

use crate::error::AgentError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Sampling and length bounds for a single generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: i32,
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// Generate text from a prompt. Bounded wait, no retry.
    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> crate::Result<String> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: GenerationConfig::from(options),
        };

        self.call(request, Duration::from_secs(30)).await
    }

    /// Transcribe raw audio bytes by inlining them into the request.
    ///
    /// Transcription gets a longer bound than text generation since the
    /// payload itself can be large.
    pub async fn transcribe_audio(&self, audio: &[u8], mime_type: &str) -> crate::Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(audio);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(
                        "Transcreva este áudio em português brasileiro. Responda APENAS com o \
                         texto transcrito, sem comentários adicionais.",
                    ),
                    Part::inline_data(mime_type, encoded),
                ],
            }],
            generation_config: GenerationConfig::from(GenerationOptions {
                temperature: 0.1,
                max_output_tokens: 1000,
            }),
        };

        self.call(request, Duration::from_secs(60)).await
    }

    async fn call(&self, request: GeminiRequest, timeout: Duration) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AgentError::ConfigError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                AgentError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(AgentError::LlmError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AgentError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        let text = gemini_response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .and_then(|part| part.text.as_deref())
            .ok_or_else(|| AgentError::LlmError("Empty response from Gemini".to_string()))?
            .trim()
            .to_string();

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(value: &str) -> Self {
        Self {
            text: Some(value.to_string()),
            inline_data: None,
        }
    }

    fn inline_data(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "topK")]
    top_k: i32,
}

impl From<GenerationOptions> for GenerationConfig {
    fn from(options: GenerationOptions) -> Self {
        Self {
            temperature: options.temperature,
            max_output_tokens: options.max_output_tokens,
            top_p: 0.8,
            top_k: 40,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
