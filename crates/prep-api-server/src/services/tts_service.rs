use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::TtsConfig;
use crate::utils::error::ApiError;

/// Text-to-speech seam for the virtual character feature.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize `text` into encoded audio bytes.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;

    /// Container format of the produced audio, e.g. "mp3".
    fn audio_format(&self) -> String;
}

#[derive(Debug, Serialize)]
struct SpeechRequest {
    input: String,
    voice: String,
    response_format: String,
}

/// HTTP client for an OpenAI-style speech endpoint.
#[derive(Clone)]
pub struct TtsService {
    client: Client,
    config: TtsConfig,
}

impl TtsService {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    pub async fn speech(&self, text: &str, voice: &str) -> Result<Vec<u8>, ApiError> {
        debug!("TTS request: {} chars, voice {}", text.len(), voice);

        let request = SpeechRequest {
            input: text.to_string(),
            voice: voice.to_string(),
            response_format: self.config.format.clone(),
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.config.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::TtsError(format!("Failed to call TTS engine: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::TtsError(format!(
                "TTS engine error: {} - {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::TtsError(format!("Failed to read TTS audio: {}", e)))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl SpeechProvider for TtsService {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        self.speech(text, voice).await.map_err(|e| anyhow::anyhow!(e))
    }

    fn audio_format(&self) -> String {
        self.config.format.clone()
    }
}
