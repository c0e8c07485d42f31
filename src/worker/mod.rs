use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use crate::{
    database::queries::{AssetQueries, JobQueries},
    errors::{AppError, Result},
    handlers::AppState,
    models::{extension_for_mime, Asset, AssetKind, AssetStatus, Job, JobParams},
    providers::face_animation::AnimationRequest,
    queue::JobMessage,
    storage::object_key,
};

const DEQUEUE_TIMEOUT_SECS: u64 = 5;

pub struct WorkerPool;

impl WorkerPool {
    /// Spawn `count` independent worker loops onto the runtime. Each loop
    /// lives for the process lifetime; dequeueing uses a short timeout so a
    /// loop iteration never holds the broker connection indefinitely.
    pub fn spawn(state: AppState, count: usize) {
        for worker_id in 0..count {
            let state = state.clone();
            tokio::spawn(async move {
                tracing::info!(worker_id, "Worker started");
                run_worker(worker_id, state).await;
            });
        }
    }
}

async fn run_worker(worker_id: usize, state: AppState) {
    loop {
        let message = match state.queue.dequeue(DEQUEUE_TIMEOUT_SECS).await {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(worker_id, "Queue dequeue failed: {}", e);
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }
        };

        process_message(worker_id, &state, message).await;
    }
}

async fn process_message(worker_id: usize, state: &AppState, message: JobMessage) {
    // Conditional claim: with at-least-once delivery a message can arrive
    // twice, but only the first claimant flips pending -> processing.
    let job = match JobQueries::claim(state.database.pool(), message.job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            tracing::debug!(worker_id, job_id = %message.job_id, "Job already claimed or gone");
            return;
        }
        Err(e) => {
            tracing::error!(worker_id, job_id = %message.job_id, "Claim failed: {}", e);
            return;
        }
    };

    tracing::info!(worker_id, job_id = %job.id, kind = job.kind.as_str(), "Job claimed");

    match execute(state, &job).await {
        Ok(output_asset_id) => {
            if let Err(e) =
                JobQueries::complete(state.database.pool(), job.id, output_asset_id).await
            {
                tracing::error!(job_id = %job.id, "Failed to record completion: {}", e);
                return;
            }
            state
                .metrics
                .record_job_outcome(job.kind.as_str(), "completed");
            tracing::info!(job_id = %job.id, output_asset_id = %output_asset_id, "Job completed");
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(persist_err) =
                JobQueries::fail(state.database.pool(), job.id, &message).await
            {
                tracing::error!(job_id = %job.id, "Failed to record failure: {}", persist_err);
            }
            state.metrics.record_job_outcome(job.kind.as_str(), "failed");
            tracing::error!(job_id = %job.id, "Job failed: {}", message);
        }
    }
}

/// Run one claimed job to completion and return the output asset id.
async fn execute(state: &AppState, job: &Job) -> Result<Uuid> {
    let params = job.params()?;
    let inputs = load_ready_inputs(state, job).await?;
    JobQueries::set_progress(state.database.pool(), job.id, 10).await?;

    let started = Instant::now();
    let (bytes, mime, kind, prefix) = match &params {
        JobParams::Tts {
            text,
            voice,
            speaking_rate,
        } => {
            JobQueries::set_progress(state.database.pool(), job.id, 30).await?;
            let audio = state
                .tts
                .synthesize(text, voice.as_deref(), *speaking_rate)
                .await?;
            state
                .metrics
                .observe_provider_request("tts", started.elapsed().as_secs_f64());
            (audio, "audio/mpeg", AssetKind::GeneratedAudio, "generated/audio")
        }
        JobParams::VoiceClone {
            voice_sample_asset_id,
            text,
            speaking_rate,
        } => {
            let sample = &inputs[voice_sample_asset_id];
            let sample_bytes = state.storage.get(&sample.storage_path).await?;
            JobQueries::set_progress(state.database.pool(), job.id, 30).await?;
            let audio = state
                .voice_clone
                .speak_with_voice(text, &sample_bytes, &sample.mime_type, *speaking_rate)
                .await?;
            state
                .metrics
                .observe_provider_request("voice_clone", started.elapsed().as_secs_f64());
            (audio, "audio/webm", AssetKind::GeneratedAudio, "generated/audio")
        }
        JobParams::VideoGeneration {
            portrait_asset_id,
            audio_asset_id,
            smoothing,
        } => {
            let portrait = &inputs[portrait_asset_id];
            let audio = &inputs[audio_asset_id];
            let portrait_bytes = state.storage.get(&portrait.storage_path).await?;
            let audio_bytes = state.storage.get(&audio.storage_path).await?;
            JobQueries::set_progress(state.database.pool(), job.id, 30).await?;

            let video = state
                .face_animation
                .animate(AnimationRequest {
                    portrait: &portrait_bytes,
                    portrait_filename: &object_filename(portrait),
                    audio: &audio_bytes,
                    audio_filename: &object_filename(audio),
                    smoothed_pitch: smoothing.pitch,
                    smoothed_yaw: smoothing.yaw,
                    smoothed_roll: smoothing.roll,
                    smoothed_translation: smoothing.translation,
                })
                .await?;
            state
                .metrics
                .observe_provider_request("face_animation", started.elapsed().as_secs_f64());
            (video, "video/mp4", AssetKind::GeneratedVideo, "generated/video")
        }
        JobParams::Export {
            video_asset_id, ..
        } => {
            let video = &inputs[video_asset_id];
            let bytes = state.storage.get(&video.storage_path).await?;
            JobQueries::set_progress(state.database.pool(), job.id, 30).await?;
            (bytes, "video/mp4", AssetKind::GeneratedVideo, "exports")
        }
    };
    JobQueries::set_progress(state.database.pool(), job.id, 80).await?;

    if bytes.is_empty() {
        return Err(AppError::provider(
            "unknown",
            None,
            "provider returned an empty result",
        ));
    }

    let filename = output_filename(&params, mime);
    let key = object_key(job.owner_id, prefix, &format!("{}.{}", Uuid::new_v4(), extension_for_mime(mime)));

    // Row first, bytes second; a crashed write leaves a visible failed asset.
    let asset = AssetQueries::create(
        state.database.pool(),
        job.owner_id,
        kind,
        AssetStatus::Processing,
        filename.as_deref(),
        mime,
        &key,
        0,
        None,
    )
    .await?;

    if let Err(e) = state.storage.put(&key, &bytes).await {
        AssetQueries::mark_failed(state.database.pool(), asset.id, "object write failed").await?;
        return Err(e);
    }

    AssetQueries::mark_ready(state.database.pool(), asset.id, &key, bytes.len() as i64).await?;
    JobQueries::set_progress(state.database.pool(), job.id, 95).await?;

    Ok(asset.id)
}

/// Re-check input readiness at claim time: an asset may have been deleted or
/// failed between job creation and dispatch.
async fn load_ready_inputs(state: &AppState, job: &Job) -> Result<HashMap<Uuid, Asset>> {
    let input_ids = JobQueries::input_asset_ids(state.database.pool(), job.id).await?;
    let mut inputs = HashMap::with_capacity(input_ids.len());

    for id in input_ids {
        let asset = AssetQueries::find_by_id(state.database.pool(), id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("Input asset {} no longer exists", id))
            })?;

        if asset.status != AssetStatus::Ready {
            return Err(AppError::Validation(format!(
                "Input asset {} is not ready (status: {:?})",
                id, asset.status
            )));
        }

        inputs.insert(id, asset);
    }

    Ok(inputs)
}

fn object_filename(asset: &Asset) -> String {
    asset
        .original_filename
        .clone()
        .unwrap_or_else(|| format!("{}.{}", asset.id, extension_for_mime(&asset.mime_type)))
}

fn output_filename(params: &JobParams, mime: &str) -> Option<String> {
    match params {
        JobParams::Export { title, .. } => {
            Some(format!("{}.{}", title.trim(), extension_for_mime(mime)))
        }
        _ => None,
    }
}
