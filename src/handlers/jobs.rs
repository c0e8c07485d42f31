use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    database::queries::{AssetQueries, JobQueries},
    errors::{AppError, Result},
    handlers::{success, AppState},
    middleware::AuthenticatedUser,
    models::{
        Asset, AssetKind, AssetStatus, CreateJobRequest, JobKind, JobParams, JobResponse,
        JobStatus, ListQuery, Pagination,
    },
    queue::JobMessage,
};

#[derive(Debug, Deserialize)]
pub struct JobListParams {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    // Shape checks come first: a bad request must fail before any row exists.
    request.params.validate()?;

    let input_ids = request.params.input_asset_ids();
    let inputs = resolve_inputs(&state, &user, &input_ids).await?;
    check_input_kinds(&request.params, &inputs)?;

    for asset in inputs.values() {
        if asset.status != AssetStatus::Ready {
            return Err(AppError::Validation(format!(
                "Input asset {} is not ready (status: {:?})",
                asset.id, asset.status
            )));
        }
    }

    let params_json = serde_json::to_value(&request.params)
        .map_err(|e| AppError::Internal(e.into()))?;

    let job = JobQueries::create(
        state.database.pool(),
        user.id,
        request.params.kind(),
        request.priority,
        &params_json,
        &input_ids,
    )
    .await?;

    let message = JobMessage {
        job_id: job.id,
        kind: job.kind,
    };
    if let Err(e) = state.queue.enqueue(&message).await {
        // No worker will ever see this row; fail it in place.
        JobQueries::fail(state.database.pool(), job.id, "failed to enqueue job").await?;
        return Err(e);
    }

    tracing::info!(job_id = %job.id, kind = job.kind.as_str(), "Job created and enqueued");

    Ok((
        StatusCode::CREATED,
        success(JobResponse::from_job(job, input_ids)),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<JobListParams>,
) -> Result<Json<serde_json::Value>> {
    let kind = params.kind.as_deref().map(JobKind::parse).transpose()?;
    let status = params.status.as_deref().map(JobStatus::parse).transpose()?;
    let page = ListQuery {
        page: params.page.unwrap_or(1),
        per_page: params.per_page.unwrap_or(20),
    }
    .normalized();

    let jobs = JobQueries::list_by_owner(
        state.database.pool(),
        user.id,
        kind,
        status,
        page.per_page,
        page.offset(),
    )
    .await?;
    let total = JobQueries::count_by_owner(state.database.pool(), user.id, kind, status).await?;

    let mut responses = Vec::with_capacity(jobs.len());
    for job in jobs {
        let input_ids = JobQueries::input_asset_ids(state.database.pool(), job.id).await?;
        responses.push(JobResponse::from_job(job, input_ids));
    }

    Ok(success(serde_json::json!({
        "jobs": responses,
        "pagination": Pagination::new(&page, total),
    })))
}

/// Poll endpoint. Read-only: fetching a completed job twice returns the same
/// `{status, result}` both times.
pub async fn get(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let job = JobQueries::find_by_id(state.database.pool(), job_id)
        .await?
        .filter(|job| job.owner_id == user.id)
        .ok_or(AppError::NotFound("Job"))?;

    let input_ids = JobQueries::input_asset_ids(state.database.pool(), job.id).await?;

    Ok(success(JobResponse::from_job(job, input_ids)))
}

async fn resolve_inputs(
    state: &AppState,
    user: &AuthenticatedUser,
    input_ids: &[Uuid],
) -> Result<HashMap<Uuid, Asset>> {
    if input_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let assets =
        AssetQueries::find_many_for_owner(state.database.pool(), user.id, input_ids).await?;
    let assets: HashMap<Uuid, Asset> = assets.into_iter().map(|a| (a.id, a)).collect();

    for id in input_ids {
        if !assets.contains_key(id) {
            return Err(AppError::Validation(format!(
                "Input asset {} not found or not owned by you",
                id
            )));
        }
    }

    Ok(assets)
}

fn check_input_kinds(params: &JobParams, inputs: &HashMap<Uuid, Asset>) -> Result<()> {
    let expect = |id: &Uuid, allowed: &[AssetKind], role: &str| -> Result<()> {
        let asset = &inputs[id];
        if !allowed.contains(&asset.kind) {
            return Err(AppError::Validation(format!(
                "Asset {} cannot be used as {} (kind: {})",
                id,
                role,
                asset.kind.as_str()
            )));
        }
        Ok(())
    };

    match params {
        JobParams::Tts { .. } => Ok(()),
        JobParams::VoiceClone {
            voice_sample_asset_id,
            ..
        } => expect(
            voice_sample_asset_id,
            &[AssetKind::VoiceSample, AssetKind::GeneratedAudio],
            "a voice sample",
        ),
        JobParams::VideoGeneration {
            portrait_asset_id,
            audio_asset_id,
            ..
        } => {
            expect(portrait_asset_id, &[AssetKind::Portrait], "a portrait")?;
            expect(
                audio_asset_id,
                &[AssetKind::GeneratedAudio, AssetKind::VoiceSample],
                "driving audio",
            )
        }
        JobParams::Export { video_asset_id, .. } => expect(
            video_asset_id,
            &[AssetKind::GeneratedVideo],
            "an export source",
        ),
    }
}
