use std::sync::Arc;

use media_generation_server::{
    config::Config,
    database::Database,
    handlers::AppState,
    providers::{FaceAnimationClient, TtsClient, VoiceCloneClient},
    queue::JobQueue,
    services::MetricsService,
    storage::local::LocalStorage,
    worker::WorkerPool,
    create_app,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "media_generation_server=info,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let database = Database::new(&config.database_url).await?;
    database.migrate().await?;
    tracing::info!("Connected to database and applied migrations");

    let queue = JobQueue::connect(&config.redis_url).await?;
    tracing::info!("Connected to queue broker");

    let storage = Arc::new(LocalStorage::new(&config.upload_dir)?);
    let metrics = Arc::new(MetricsService::new()?);

    let tts = Arc::new(TtsClient::new(&config.tts)?);
    let voice_clone = Arc::new(VoiceCloneClient::new(&config.voice_clone)?);
    let face_animation = Arc::new(FaceAnimationClient::new(&config.face_animation)?);

    let state = AppState {
        database,
        queue,
        storage,
        config: config.clone(),
        metrics,
        tts,
        voice_clone,
        face_animation,
    };

    WorkerPool::spawn(state.clone(), config.worker_count);
    tracing::info!("Spawned {} workers", config.worker_count);

    let app = create_app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
