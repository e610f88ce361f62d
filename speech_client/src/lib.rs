use std::{env, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Instruction prepended to every script line before synthesis.
const TONE_PROMPT: &str = "Say with a clear and professional tone: ";

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("API_KEY is not set in environment variables.")]
    MissingApiKey,

    #[error("Script text cannot be empty.")]
    EmptyText,

    #[error("Speech request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Speech API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid speech API response: {0}")]
    InvalidResponse(String),

    #[error("Failed to generate audio. The response did not contain audio data.")]
    NoAudio,
}

/// Anything that turns text into base64 PCM (24 kHz, 16-bit LE, mono).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn generate_speech(&self, text: &str, voice: &str) -> Result<String, SpeechError>;

    fn provider_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl SpeechConfig {
    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        let model = env::var("GEMINI_TTS_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = env::var("GEMINI_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = env::var("SPEECH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            api_key,
            model,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest<'a> {
    contents: Vec<Content>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechSettings<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechSettings<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoice<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice<'a> {
    voice_name: &'a str,
}

// Response: only the path down to the inline audio is modelled

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: Option<String>,
}

/// Body asking the model to read `text` aloud with `voice`.
pub fn build_request_body<'a>(text: &str, voice: &'a str) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![TextPart {
                text: format!("{TONE_PROMPT}{text}"),
            }],
        }],
        generation_config: GenerationConfig {
            response_modalities: ["AUDIO"],
            speech_config: SpeechSettings {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoice { voice_name: voice },
                },
            },
        },
    }
}

/// Pull the base64 audio out of the first candidate's first part.
pub fn extract_audio(body: &str) -> Result<String, SpeechError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| SpeechError::InvalidResponse(e.to_string()))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.inline_data)
        .and_then(|d| d.data)
        .filter(|d| !d.is_empty())
        .ok_or(SpeechError::NoAudio)
}

pub struct GeminiSpeechClient {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiSpeechClient {
    pub fn new(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Create a client from environment variables (see [`SpeechConfig::from_env`]).
    pub fn from_env() -> Result<Self, SpeechError> {
        Self::new(&SpeechConfig::from_env())
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeechClient {
    async fn generate_speech(&self, text: &str, voice: &str) -> Result<String, SpeechError> {
        let api_key = self.api_key.as_deref().ok_or(SpeechError::MissingApiKey)?;
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }

        debug!(model = %self.model, voice, chars = text.chars().count(), "requesting speech");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&build_request_body(text, voice))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "speech API returned an error");
            return Err(SpeechError::Api {
                status: status.as_u16(),
                body,
            });
        }

        extract_audio(&body)
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_prompt_and_voice() {
        let body = serde_json::to_value(build_request_body("Xin chào", "Puck")).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            "Say with a clear and professional tone: Xin chào"
        );
        assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Puck"
        );
    }

    #[test]
    fn extracts_inline_audio() {
        let body = r#"{
            "candidates": [{
                "content": {
                    "parts": [{ "inlineData": { "mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AQIDBA==" } }],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(extract_audio(body).unwrap(), "AQIDBA==");
    }

    #[test]
    fn missing_audio_is_reported() {
        assert!(matches!(
            extract_audio(r#"{"candidates":[]}"#),
            Err(SpeechError::NoAudio)
        ));
        assert!(matches!(
            extract_audio(r#"{"candidates":[{"content":{"parts":[{"text":"sorry"}]}}]}"#),
            Err(SpeechError::NoAudio)
        ));
        assert!(matches!(extract_audio("{}"), Err(SpeechError::NoAudio)));
    }

    #[test]
    fn malformed_json_is_invalid_response() {
        assert!(matches!(
            extract_audio("not json"),
            Err(SpeechError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let config = SpeechConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            ..SpeechConfig::default()
        };
        let client = GeminiSpeechClient::new(&config).unwrap();
        assert!(matches!(
            client.generate_speech("Hello", "Kore").await,
            Err(SpeechError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn blank_text_fails_before_any_request() {
        let config = SpeechConfig {
            api_key: Some("test-key".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            ..SpeechConfig::default()
        };
        let client = GeminiSpeechClient::new(&config).unwrap();
        assert!(matches!(
            client.generate_speech("   ", "Kore").await,
            Err(SpeechError::EmptyText)
        ));
    }

    #[test]
    fn endpoint_joins_model() {
        let config = SpeechConfig {
            base_url: "https://example.test/v1beta/".to_string(),
            ..SpeechConfig::default()
        };
        let client = GeminiSpeechClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"
        );
    }
}
