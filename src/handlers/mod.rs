use std::sync::Arc;

use crate::{
    config::Config,
    database::Database,
    providers::{FaceAnimationClient, TtsClient, VoiceCloneClient},
    queue::JobQueue,
    services::MetricsService,
    storage::ObjectStorage,
};

pub mod assets;
pub mod auth;
pub mod health;
pub mod jobs;
pub mod metrics;

/// Explicitly constructed once at startup and handed to both the router and
/// the worker pool; nothing here lives in a process-global.
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub queue: JobQueue,
    pub storage: Arc<dyn ObjectStorage>,
    pub config: Config,
    pub metrics: Arc<MetricsService>,
    pub tts: Arc<TtsClient>,
    pub voice_clone: Arc<VoiceCloneClient>,
    pub face_animation: Arc<FaceAnimationClient>,
}

/// Standard success envelope: `{"success": true, "data": ...}`.
pub(crate) fn success(data: impl serde::Serialize) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "data": data,
    }))
}
