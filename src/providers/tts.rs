use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::TtsConfig;
use crate::errors::{AppError, Result};
use crate::providers::{sse_data_payloads, ProviderHealth};

const PROVIDER: &str = "tts";

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    output_format: &'a str,
    speaking_rate: f64,
}

#[derive(Debug, Deserialize)]
struct SynthesisEvent {
    url: Option<String>,
}

/// Commercial text-to-speech REST API. The endpoint answers a synthesis
/// request with an event stream whose final payload carries the URL of the
/// rendered audio file.
pub struct TtsClient {
    client: Client,
    base_url: String,
    api_key: String,
    user_id: String,
    default_voice: String,
}

impl TtsClient {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            user_id: config.user_id.clone(),
            default_voice: config.default_voice.clone(),
        })
    }

    pub async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speaking_rate: f64,
    ) -> Result<Vec<u8>> {
        let request = SynthesisRequest {
            text,
            voice: voice.unwrap_or(&self.default_voice),
            output_format: "mp3",
            speaking_rate,
        };

        let response = self
            .client
            .post(format!("{}/tts", self.base_url))
            .header("accept", "text/event-stream")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-USER-ID", &self.user_id)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, None, format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::provider(PROVIDER, Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::provider(
                PROVIDER,
                Some(status.as_u16()),
                truncate(&body, 500),
            ));
        }

        let audio_url = extract_audio_url(&body).ok_or_else(|| {
            AppError::provider(
                PROVIDER,
                Some(status.as_u16()),
                "response stream contained no audio URL",
            )
        })?;

        self.download(&audio_url).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, None, format!("audio fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::provider(
                PROVIDER,
                Some(status.as_u16()),
                "audio URL returned an error",
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::provider(PROVIDER, Some(status.as_u16()), e.to_string()))?;

        Ok(bytes.to_vec())
    }

    pub async fn health_check(&self) -> ProviderHealth {
        let start = Instant::now();
        let result = self
            .client
            .get(format!("{}/voices", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-USER-ID", &self.user_id)
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

/// The stream interleaves progress events; the audio URL is in the last
/// payload that carries one.
fn extract_audio_url(body: &str) -> Option<String> {
    sse_data_payloads(body)
        .into_iter()
        .filter_map(|payload| serde_json::from_str::<SynthesisEvent>(payload).ok())
        .filter_map(|event| event.url)
        .last()
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_url_comes_from_last_data_payload() {
        let body = concat!(
            "event: generating\n",
            "data: {\"stage\": \"queued\"}\n",
            "\n",
            "event: completed\n",
            "data: {\"url\": \"https://cdn.example/audio/1.mp3\", \"duration\": 3.4}\n",
        );
        assert_eq!(
            extract_audio_url(body).as_deref(),
            Some("https://cdn.example/audio/1.mp3")
        );
    }

    #[test]
    fn missing_url_yields_none() {
        assert!(extract_audio_url("data: {\"stage\": \"queued\"}\n").is_none());
        assert!(extract_audio_url("").is_none());
    }

    #[test]
    fn truncate_caps_long_bodies() {
        let long = "x".repeat(600);
        assert_eq!(truncate(&long, 500).len(), 503);
        assert_eq!(truncate("short", 500), "short");
    }
}
