use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Tts,
    VoiceClone,
    VideoGeneration,
    Export,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Tts => "tts",
            JobKind::VoiceClone => "voice_clone",
            JobKind::VideoGeneration => "video_generation",
            JobKind::Export => "export",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "tts" => Ok(JobKind::Tts),
            "voice_clone" => Ok(JobKind::VoiceClone),
            "video_generation" => Ok(JobKind::VideoGeneration),
            "export" => Ok(JobKind::Export),
            other => Err(AppError::Validation(format!("Invalid job kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(AppError::Validation(format!("Invalid job status: {}", other))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Low,
    Normal,
    High,
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority::Normal
    }
}

/// Head-motion smoothing knobs passed through to the face animation space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Smoothing {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub translation: f64,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            pitch: 0.8,
            yaw: 0.8,
            roll: 0.8,
            translation: 0.8,
        }
    }
}

fn default_speaking_rate() -> f64 {
    15.0
}

/// Typed parameters, one variant per job kind. Serialized with an internal
/// `kind` tag so the create-job request body reads naturally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobParams {
    Tts {
        text: String,
        #[serde(default)]
        voice: Option<String>,
        #[serde(default = "default_speaking_rate")]
        speaking_rate: f64,
    },
    VoiceClone {
        voice_sample_asset_id: Uuid,
        text: String,
        #[serde(default = "default_speaking_rate")]
        speaking_rate: f64,
    },
    VideoGeneration {
        portrait_asset_id: Uuid,
        audio_asset_id: Uuid,
        #[serde(default)]
        smoothing: Smoothing,
    },
    Export {
        video_asset_id: Uuid,
        title: String,
    },
}

impl JobParams {
    pub fn kind(&self) -> JobKind {
        match self {
            JobParams::Tts { .. } => JobKind::Tts,
            JobParams::VoiceClone { .. } => JobKind::VoiceClone,
            JobParams::VideoGeneration { .. } => JobKind::VideoGeneration,
            JobParams::Export { .. } => JobKind::Export,
        }
    }

    /// Shape checks that must hold before a Job row is created.
    pub fn validate(&self) -> Result<()> {
        match self {
            JobParams::Tts {
                text, speaking_rate, ..
            }
            | JobParams::VoiceClone {
                text, speaking_rate, ..
            } => {
                if text.trim().is_empty() {
                    return Err(AppError::Validation("text must not be empty".to_string()));
                }
                if text.len() > 20_000 {
                    return Err(AppError::Validation(
                        "text exceeds the 20000 character limit".to_string(),
                    ));
                }
                if !(*speaking_rate > 0.0 && *speaking_rate <= 40.0) {
                    return Err(AppError::Validation(
                        "speaking_rate must be between 0 and 40".to_string(),
                    ));
                }
            }
            JobParams::VideoGeneration {
                portrait_asset_id,
                audio_asset_id,
                smoothing,
            } => {
                if portrait_asset_id == audio_asset_id {
                    return Err(AppError::Validation(
                        "portrait and audio must be distinct assets".to_string(),
                    ));
                }
                for v in [
                    smoothing.pitch,
                    smoothing.yaw,
                    smoothing.roll,
                    smoothing.translation,
                ] {
                    if !(0.0..=1.0).contains(&v) {
                        return Err(AppError::Validation(
                            "smoothing values must be within [0, 1]".to_string(),
                        ));
                    }
                }
            }
            JobParams::Export { title, .. } => {
                if title.trim().is_empty() {
                    return Err(AppError::Validation("title must not be empty".to_string()));
                }
                if title.len() > 200 {
                    return Err(AppError::Validation(
                        "title exceeds the 200 character limit".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Assets this job consumes; all must be `ready` before dispatch.
    pub fn input_asset_ids(&self) -> Vec<Uuid> {
        match self {
            JobParams::Tts { .. } => vec![],
            JobParams::VoiceClone {
                voice_sample_asset_id,
                ..
            } => vec![*voice_sample_asset_id],
            JobParams::VideoGeneration {
                portrait_asset_id,
                audio_asset_id,
                ..
            } => vec![*portrait_asset_id, *audio_asset_id],
            JobParams::Export { video_asset_id, .. } => vec![*video_asset_id],
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub priority: JobPriority,
    pub params: serde_json::Value,
    pub output_asset_id: Option<Uuid>,
    pub progress: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn params(&self) -> Result<JobParams> {
        serde_json::from_value(self.params.clone())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt job params: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    #[serde(default)]
    pub priority: JobPriority,
    #[serde(flatten)]
    pub params: JobParams,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub priority: JobPriority,
    pub params: serde_json::Value,
    pub input_asset_ids: Vec<Uuid>,
    pub output_asset_id: Option<Uuid>,
    pub progress: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobResponse {
    pub fn from_job(job: Job, input_asset_ids: Vec<Uuid>) -> Self {
        Self {
            id: job.id,
            kind: job.kind,
            status: job.status,
            priority: job.priority,
            params: job.params,
            input_asset_ids,
            output_asset_id: job.output_asset_id,
            progress: job.progress,
            error_message: job.error_message,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_parses_tagged_params() {
        let request: CreateJobRequest = serde_json::from_value(json!({
            "kind": "tts",
            "text": "Hello there",
            "priority": "high"
        }))
        .unwrap();

        assert_eq!(request.priority, JobPriority::High);
        match request.params {
            JobParams::Tts {
                ref text,
                ref voice,
                speaking_rate,
            } => {
                assert_eq!(text, "Hello there");
                assert!(voice.is_none());
                assert_eq!(speaking_rate, 15.0);
            }
            _ => panic!("expected tts params"),
        }
    }

    #[test]
    fn empty_text_is_rejected_before_any_row_exists() {
        let params: JobParams = serde_json::from_value(json!({
            "kind": "tts",
            "text": "   "
        }))
        .unwrap();
        assert!(params.validate().is_err());
    }

    #[test]
    fn video_generation_lists_both_inputs() {
        let portrait = Uuid::new_v4();
        let audio = Uuid::new_v4();
        let params = JobParams::VideoGeneration {
            portrait_asset_id: portrait,
            audio_asset_id: audio,
            smoothing: Smoothing::default(),
        };
        assert_eq!(params.input_asset_ids(), vec![portrait, audio]);
        assert_eq!(params.kind(), JobKind::VideoGeneration);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn smoothing_out_of_range_is_rejected() {
        let params = JobParams::VideoGeneration {
            portrait_asset_id: Uuid::new_v4(),
            audio_asset_id: Uuid::new_v4(),
            smoothing: Smoothing {
                pitch: 1.5,
                ..Smoothing::default()
            },
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let result: std::result::Result<JobParams, _> = serde_json::from_value(json!({
            "kind": "teleport",
            "text": "hi"
        }));
        assert!(result.is_err());
    }
}
