use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "asset_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Portrait,
    VoiceSample,
    Script,
    GeneratedAudio,
    GeneratedVideo,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Portrait => "portrait",
            AssetKind::VoiceSample => "voice_sample",
            AssetKind::Script => "script",
            AssetKind::GeneratedAudio => "generated_audio",
            AssetKind::GeneratedVideo => "generated_video",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "portrait" => Ok(AssetKind::Portrait),
            "voice_sample" => Ok(AssetKind::VoiceSample),
            "script" => Ok(AssetKind::Script),
            "generated_audio" => Ok(AssetKind::GeneratedAudio),
            "generated_video" => Ok(AssetKind::GeneratedVideo),
            other => Err(AppError::Validation(format!("Invalid asset kind: {}", other))),
        }
    }

    /// Kinds a client may upload directly; generated kinds are worker-only.
    pub fn uploadable(&self) -> bool {
        matches!(
            self,
            AssetKind::Portrait | AssetKind::VoiceSample | AssetKind::Script
        )
    }

    pub fn allows_mime(&self, mime: &str) -> bool {
        match self {
            AssetKind::Portrait => {
                matches!(mime, "image/jpeg" | "image/png" | "image/webp")
            }
            AssetKind::VoiceSample | AssetKind::GeneratedAudio => matches!(
                mime,
                "audio/wav" | "audio/x-wav" | "audio/mpeg" | "audio/webm" | "audio/ogg"
            ),
            AssetKind::Script => matches!(mime, "text/plain" | "text/markdown"),
            AssetKind::GeneratedVideo => matches!(mime, "video/mp4" | "video/webm"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "asset_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Uploaded,
    Processing,
    Ready,
    Failed,
}

impl AssetStatus {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "uploaded" => Ok(AssetStatus::Uploaded),
            "processing" => Ok(AssetStatus::Processing),
            "ready" => Ok(AssetStatus::Ready),
            "failed" => Ok(AssetStatus::Failed),
            other => Err(AppError::Validation(format!(
                "Invalid asset status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: AssetKind,
    pub status: AssetStatus,
    pub original_filename: Option<String>,
    pub mime_type: String,
    pub storage_path: String,
    pub file_size: i64,
    pub sha256: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AssetResponse {
    pub id: Uuid,
    pub kind: AssetKind,
    pub status: AssetStatus,
    pub original_filename: Option<String>,
    pub mime_type: String,
    pub file_size: i64,
    pub error_message: Option<String>,
    pub download_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Asset> for AssetResponse {
    fn from(asset: Asset) -> Self {
        Self {
            download_url: format!("/api/assets/{}/download", asset.id),
            id: asset.id,
            kind: asset.kind,
            status: asset.status,
            original_filename: asset.original_filename,
            mime_type: asset.mime_type,
            file_size: asset.file_size,
            error_message: asset.error_message,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/mpeg" => "mp3",
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "text/plain" => "txt",
        "text/markdown" => "md",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploadable_kinds_exclude_generated() {
        assert!(AssetKind::Portrait.uploadable());
        assert!(AssetKind::VoiceSample.uploadable());
        assert!(AssetKind::Script.uploadable());
        assert!(!AssetKind::GeneratedAudio.uploadable());
        assert!(!AssetKind::GeneratedVideo.uploadable());
    }

    #[test]
    fn mime_allowlists_are_per_kind() {
        assert!(AssetKind::Portrait.allows_mime("image/png"));
        assert!(!AssetKind::Portrait.allows_mime("audio/wav"));
        assert!(AssetKind::VoiceSample.allows_mime("audio/wav"));
        assert!(!AssetKind::VoiceSample.allows_mime("video/mp4"));
        assert!(AssetKind::GeneratedVideo.allows_mime("video/mp4"));
    }

    #[test]
    fn kind_round_trips_through_parse() {
        for kind in [
            AssetKind::Portrait,
            AssetKind::VoiceSample,
            AssetKind::Script,
            AssetKind::GeneratedAudio,
            AssetKind::GeneratedVideo,
        ] {
            assert_eq!(AssetKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(AssetKind::parse("hologram").is_err());
    }
}
