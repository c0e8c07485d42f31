use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Json, Response},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    handlers::{success, AppState},
    middleware::AuthenticatedUser,
    models::{
        extension_for_mime, Asset, AssetKind, AssetResponse, AssetStatus, ListQuery, Pagination,
    },
    database::queries::AssetQueries,
    storage::object_key,
};

#[derive(Debug, Deserialize)]
pub struct AssetListParams {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn upload(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let mut kind: Option<AssetKind> = None;
    let mut file_data: Option<Vec<u8>> = None;
    let mut original_filename: Option<String> = None;
    let mut mime_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Malformed multipart body".to_string()))?
    {
        match field.name().unwrap_or("") {
            "kind" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::Validation("Malformed kind field".to_string()))?;
                kind = Some(AssetKind::parse(&value)?);
            }
            "file" => {
                original_filename = field.file_name().map(|s| s.to_string());
                mime_type = field.content_type().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|_| AppError::Validation("Failed to read file field".to_string()))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| AppError::Validation("Field 'kind' is required".to_string()))?;
    let file_data =
        file_data.ok_or_else(|| AppError::Validation("Field 'file' is required".to_string()))?;
    let mime_type = mime_type
        .ok_or_else(|| AppError::Validation("File content type is required".to_string()))?;

    if !kind.uploadable() {
        return Err(AppError::Validation(format!(
            "Asset kind '{}' cannot be uploaded directly",
            kind.as_str()
        )));
    }
    if file_data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if file_data.len() > state.config.max_upload_size {
        return Err(AppError::Validation(format!(
            "File exceeds the {} byte upload limit",
            state.config.max_upload_size
        )));
    }
    if !kind.allows_mime(&mime_type) {
        return Err(AppError::Validation(format!(
            "Content type '{}' is not allowed for '{}' assets",
            mime_type,
            kind.as_str()
        )));
    }

    let sha256 = hex_digest(&file_data);
    let filename = format!("{}.{}", Uuid::new_v4(), extension_for_mime(&mime_type));
    let key = object_key(user.id, "uploads", &filename);

    let asset = AssetQueries::create(
        state.database.pool(),
        user.id,
        kind,
        AssetStatus::Uploaded,
        original_filename.as_deref(),
        &mime_type,
        &key,
        file_data.len() as i64,
        Some(&sha256),
    )
    .await?;

    if let Err(e) = state.storage.put(&key, &file_data).await {
        AssetQueries::mark_failed(state.database.pool(), asset.id, "object write failed").await?;
        return Err(e);
    }

    AssetQueries::mark_ready(state.database.pool(), asset.id, &key, file_data.len() as i64)
        .await?;
    state.metrics.record_upload();

    tracing::info!(asset_id = %asset.id, kind = kind.as_str(), "Asset uploaded");

    let asset = AssetQueries::find_by_id(state.database.pool(), asset.id)
        .await?
        .ok_or(AppError::NotFound("Asset"))?;

    Ok((StatusCode::CREATED, success(AssetResponse::from(asset))))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<AssetListParams>,
) -> Result<Json<serde_json::Value>> {
    let kind = params.kind.as_deref().map(AssetKind::parse).transpose()?;
    let status = params
        .status
        .as_deref()
        .map(AssetStatus::parse)
        .transpose()?;
    let page = ListQuery {
        page: params.page.unwrap_or(1),
        per_page: params.per_page.unwrap_or(20),
    }
    .normalized();

    let assets = AssetQueries::list_by_owner(
        state.database.pool(),
        user.id,
        kind,
        status,
        page.per_page,
        page.offset(),
    )
    .await?;
    let total = AssetQueries::count_by_owner(state.database.pool(), user.id, kind, status).await?;

    let responses: Vec<AssetResponse> = assets.into_iter().map(AssetResponse::from).collect();

    Ok(success(serde_json::json!({
        "assets": responses,
        "pagination": Pagination::new(&page, total),
    })))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let asset = owned_asset(&state, &user, asset_id).await?;
    Ok(success(AssetResponse::from(asset)))
}

pub async fn download(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(asset_id): Path<Uuid>,
) -> Result<Response> {
    let asset = owned_asset(&state, &user, asset_id).await?;

    if asset.status != AssetStatus::Ready {
        return Err(AppError::Validation(format!(
            "Asset is not ready (status: {:?})",
            asset.status
        )));
    }

    let reader = state.storage.reader(&asset.storage_path).await?;
    let stream = ReaderStream::new(reader);

    let filename = asset
        .original_filename
        .unwrap_or_else(|| format!("{}.{}", asset.id, extension_for_mime(&asset.mime_type)));

    let response = Response::builder()
        .header(header::CONTENT_TYPE, asset.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(response)
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let asset = owned_asset(&state, &user, asset_id).await?;

    if AssetQueries::in_use_by_active_job(state.database.pool(), asset.id).await? {
        return Err(AppError::Validation(
            "Asset is referenced by a pending or running job".to_string(),
        ));
    }

    // Backing object goes first, then the row.
    if state.storage.exists(&asset.storage_path).await? {
        state.storage.delete(&asset.storage_path).await?;
    }
    AssetQueries::delete(state.database.pool(), asset.id).await?;

    tracing::info!(asset_id = %asset.id, "Asset deleted");

    Ok(success(serde_json::json!({ "deleted": asset.id })))
}

async fn owned_asset(
    state: &AppState,
    user: &AuthenticatedUser,
    asset_id: Uuid,
) -> Result<Asset> {
    let asset = AssetQueries::find_by_id(state.database.pool(), asset_id)
        .await?
        .ok_or(AppError::NotFound("Asset"))?;

    if asset.owner_id != user.id {
        // Owner mismatch reads as missing.
        return Err(AppError::NotFound("Asset"));
    }

    Ok(asset)
}

fn hex_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
