use serde::Serialize;

pub mod face_animation;
pub mod tts;
pub mod voice_clone;

pub use face_animation::FaceAnimationClient;
pub use tts::TtsClient;
pub use voice_clone::VoiceCloneClient;

/// Diagnostics-only reachability/credential report for one provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub provider: &'static str,
    pub healthy: bool,
    pub detail: String,
    pub response_time_ms: u64,
}

impl ProviderHealth {
    pub fn healthy(provider: &'static str, response_time_ms: u64) -> Self {
        Self {
            provider,
            healthy: true,
            detail: "reachable".to_string(),
            response_time_ms,
        }
    }

    pub fn unhealthy(provider: &'static str, detail: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            provider,
            healthy: false,
            detail: detail.into(),
            response_time_ms,
        }
    }
}

/// Payloads of `data:` lines in an event-stream response body, in order.
pub(crate) fn sse_data_payloads(body: &str) -> Vec<&str> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|payload| !payload.is_empty())
        .collect()
}
