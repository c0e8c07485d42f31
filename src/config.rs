use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub upload_dir: String,
    pub max_upload_size: usize,
    pub jwt_secret: String,
    pub worker_count: usize,
    pub tts: TtsConfig,
    pub voice_clone: VoiceCloneConfig,
    pub face_animation: FaceAnimationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    pub base_url: String,
    pub api_key: String,
    pub user_id: String,
    pub default_voice: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceCloneConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaceAnimationConfig {
    pub space_url: String,
    pub hf_token: Option<String>,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/media_generation".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "./uploads".to_string()),
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .unwrap_or_else(|_| "52428800".to_string()) // 50MB
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "change-me-in-production".to_string()),
            worker_count: env::var("WORKER_COUNT")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,
            tts: TtsConfig {
                base_url: env::var("TTS_BASE_URL")
                    .unwrap_or_else(|_| "https://api.play.ht/api/v2".to_string()),
                api_key: env::var("TTS_API_KEY").unwrap_or_default(),
                user_id: env::var("TTS_USER_ID").unwrap_or_default(),
                default_voice: env::var("TTS_DEFAULT_VOICE")
                    .unwrap_or_else(|_| "larry".to_string()),
                timeout_secs: env::var("TTS_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()?,
            },
            voice_clone: VoiceCloneConfig {
                base_url: env::var("VOICE_CLONE_BASE_URL")
                    .unwrap_or_else(|_| "https://api.zyphra.com/v1".to_string()),
                api_key: env::var("VOICE_CLONE_API_KEY").unwrap_or_default(),
                timeout_secs: env::var("VOICE_CLONE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()?,
            },
            face_animation: FaceAnimationConfig {
                space_url: env::var("FACE_ANIMATION_SPACE_URL")
                    .unwrap_or_else(|_| "https://fffiloni-kdtalker.hf.space".to_string()),
                hf_token: env::var("HF_API_TOKEN").ok(),
                // Video generation is slow, default to five minutes like the upstream space
                timeout_secs: env::var("FACE_ANIMATION_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()?,
            },
        })
    }
}
