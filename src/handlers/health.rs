use axum::{extract::State, response::Json};
use serde_json::json;

use crate::{errors::Result, handlers::AppState};

pub async fn liveness() -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub async fn readiness(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let db_status = match sqlx::query("SELECT 1").fetch_one(state.database.pool()).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let queue_status = match state.queue.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let overall_status = if db_status == "healthy" && queue_status == "healthy" {
        "ready"
    } else {
        "not_ready"
    };

    Ok(Json(json!({
        "status": overall_status,
        "checks": {
            "database": db_status,
            "queue": queue_status
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Diagnostics only; the job pipeline never consults these results.
pub async fn providers(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let (tts, voice_clone, face_animation) = tokio::join!(
        state.tts.health_check(),
        state.voice_clone.health_check(),
        state.face_animation.health_check(),
    );

    let all_healthy = tts.healthy && voice_clone.healthy && face_animation.healthy;

    Ok(Json(json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "providers": [tts, voice_clone, face_animation],
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
