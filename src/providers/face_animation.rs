use reqwest::{multipart, Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::config::FaceAnimationConfig;
use crate::errors::{AppError, Result};
use crate::providers::{sse_data_payloads, ProviderHealth};

const PROVIDER: &str = "face_animation";
const GENERATE_ROUTE: &str = "generate";

/// Talking-head video space hosted behind the Gradio HTTP API. Inputs are
/// uploaded first, then a generation call is queued and its event stream
/// polled for the result file.
pub struct FaceAnimationClient {
    client: Client,
    space_url: String,
    hf_token: Option<String>,
}

pub struct AnimationRequest<'a> {
    pub portrait: &'a [u8],
    pub portrait_filename: &'a str,
    pub audio: &'a [u8],
    pub audio_filename: &'a str,
    pub smoothed_pitch: f64,
    pub smoothed_yaw: f64,
    pub smoothed_roll: f64,
    pub smoothed_translation: f64,
}

impl FaceAnimationClient {
    pub fn new(config: &FaceAnimationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            space_url: config.space_url.trim_end_matches('/').to_string(),
            hf_token: config.hf_token.clone(),
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.hf_token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    pub async fn animate(&self, request: AnimationRequest<'_>) -> Result<Vec<u8>> {
        let portrait_path = self
            .upload_file(request.portrait, request.portrait_filename)
            .await?;
        let audio_path = self.upload_file(request.audio, request.audio_filename).await?;

        let event_id = self
            .queue_generation(
                &portrait_path,
                &audio_path,
                request.smoothed_pitch,
                request.smoothed_yaw,
                request.smoothed_roll,
                request.smoothed_translation,
            )
            .await?;

        let video_url = self.await_result(&event_id).await?;
        self.download(&video_url).await
    }

    /// Stage the raw bytes with the space; it answers with its server-side path.
    async fn upload_file(&self, data: &[u8], filename: &str) -> Result<String> {
        let part = multipart::Part::bytes(data.to_vec()).file_name(filename.to_string());
        let form = multipart::Form::new().part("files", part);

        let response = self
            .authorize(self.client.post(format!("{}/gradio_api/upload", self.space_url)))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, None, format!("upload failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::provider(PROVIDER, Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::provider(
                PROVIDER,
                Some(status.as_u16()),
                format!("upload rejected: {}", body.chars().take(200).collect::<String>()),
            ));
        }

        parse_uploaded_path(&body).ok_or_else(|| {
            AppError::provider(PROVIDER, Some(status.as_u16()), "upload response had no path")
        })
    }

    async fn queue_generation(
        &self,
        portrait_path: &str,
        audio_path: &str,
        pitch: f64,
        yaw: f64,
        roll: f64,
        translation: f64,
    ) -> Result<String> {
        let payload = json!({
            "data": [
                { "path": portrait_path, "meta": { "_type": "gradio.FileData" } },
                { "path": audio_path, "meta": { "_type": "gradio.FileData" } },
                pitch,
                yaw,
                roll,
                translation,
            ]
        });

        let response = self
            .authorize(self.client.post(format!(
                "{}/gradio_api/call/{}",
                self.space_url, GENERATE_ROUTE
            )))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, None, format!("call failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::provider(PROVIDER, Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::provider(
                PROVIDER,
                Some(status.as_u16()),
                format!("generation call rejected: {}", body),
            ));
        }

        body.get("event_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::provider(PROVIDER, Some(status.as_u16()), "call response had no event_id")
            })
    }

    /// Block on the event stream until the space reports the finished file.
    async fn await_result(&self, event_id: &str) -> Result<String> {
        let response = self
            .authorize(self.client.get(format!(
                "{}/gradio_api/call/{}/{}",
                self.space_url, GENERATE_ROUTE, event_id
            )))
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, None, format!("result poll failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::provider(PROVIDER, Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::provider(
                PROVIDER,
                Some(status.as_u16()),
                "result poll returned an error",
            ));
        }

        extract_result_url(&body).ok_or_else(|| {
            AppError::provider(
                PROVIDER,
                Some(status.as_u16()),
                "generation stream ended without a file",
            )
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, None, format!("video fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::provider(
                PROVIDER,
                Some(status.as_u16()),
                "video URL returned an error",
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
            .authorize(self.client.get(format!("{}/gradio_api/info", self.space_url)))
            .send()
            .await;
        let elapsed = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) if response.status().is_success() => {
                ProviderHealth::healthy(PROVIDER, elapsed)
            }
            Ok(response) => ProviderHealth::unhealthy(
                PROVIDER,
                format!("space returned {}", response.status()),
                elapsed,
            ),
            Err(e) => ProviderHealth::unhealthy(PROVIDER, e.to_string(), elapsed),
        }
    }
}

fn parse_uploaded_path(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .as_array()?
        .first()?
        .as_str()
        .map(str::to_string)
}

/// The final `data:` payload is an array of outputs; the video arrives as a
/// FileData object carrying a `url` somewhere inside it.
fn extract_result_url(body: &str) -> Option<String> {
    sse_data_payloads(body)
        .into_iter()
        .filter_map(|payload| serde_json::from_str::<Value>(payload).ok())
        .filter_map(|value| find_url(&value))
        .last()
}

fn find_url(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(url)) = map.get("url") {
                return Some(url.clone());
            }
            map.values().find_map(find_url)
        }
        Value::Array(items) => items.iter().find_map(find_url),
        _ => None,
    }
}
