use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::config::VoiceCloneConfig;
use crate::errors::{AppError, Result};
use crate::providers::ProviderHealth;

const PROVIDER: &str = "voice_clone";

#[derive(Debug, Serialize)]
struct CloneSpeechRequest<'a> {
    text: &'a str,
    speaking_rate: f64,
    speaker_audio: String,
    mime_type: &'a str,
}

/// Voice-cloning TTS API: a reference recording rides along with every
/// synthesis request as base64 and the response body is the rendered audio.
pub struct VoiceCloneClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl VoiceCloneClient {
    pub fn new(config: &VoiceCloneConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn speak_with_voice(
        &self,
        text: &str,
        speaker_audio: &[u8],
        speaker_mime: &str,
        speaking_rate: f64,
    ) -> Result<Vec<u8>> {
        let request = CloneSpeechRequest {
            text,
            speaking_rate,
            speaker_audio: BASE64.encode(speaker_audio),
            mime_type: speaker_mime,
        };

        let response = self
            .client
            .post(format!("{}/audio/text-to-speech", self.base_url))
            .header("X-API-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, None, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = if body.is_empty() {
                format!("upstream returned {}", status)
            } else {
                body.chars().take(500).collect()
            };
            return Err(AppError::provider(PROVIDER, Some(status.as_u16()), detail));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::provider(PROVIDER, Some(status.as_u16()), e.to_string()))?;

        if bytes.is_empty() {
            return Err(AppError::provider(
                PROVIDER,
                Some(status.as_u16()),
                "upstream returned an empty audio body",
            ));
        }

        Ok(bytes.to_vec())
    }

    pub async fn health_check(&self) -> ProviderHealth {
        let start = Instant::now();
        let result = self
            .client
            .get(format!("{}/audio/voices", self.base_url))
            .header("X-API-Key", &self.api_key)
            .send()
            .await;
        let elapsed = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) if response.status().is_success() => {
                ProviderHealth::healthy(PROVIDER, elapsed)
            }
            Ok(response) => ProviderHealth::unhealthy(
                PROVIDER,
                format!("upstream returned {}", response.status()),
                elapsed,
            ),
            Err(e) => ProviderHealth::unhealthy(PROVIDER, e.to_string(), elapsed),
        }
    }
}
