use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use narration_backend::controllers::tts::TtsController;
use narration_backend::domain::auth::JwtManager;
use narration_backend::domain::tts::{
    CircuitBreakerRegistry, ParagraphCache, ProviderSet, QuotaGate, TtsService, VoiceResolver,
};
use narration_backend::infrastructure::config::{Config, LogFormat};
use narration_backend::infrastructure::db::{check_connection, create_pool, run_migrations};
use narration_backend::infrastructure::http::{create_router, start_http_server};
use narration_backend::infrastructure::repositories::{
    ElevenLabsTtsRepository, LocalAudioStorage, OpenAiTtsRepository, PgCustomVoiceRepository,
    PgParagraphCacheRepository, PgSubscriptionRepository, PollyTtsRepository,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        environment = ?config.environment,
        "Starting Narration Backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database connection pool created");

    let latency = check_connection(&pool).await?;
    run_migrations(&pool).await?;
    tracing::info!(
        latency_ms = latency.as_millis() as u64,
        "Database connection verified and migrations applied"
    );

    // Vendor clients
    tracing::info!("Initializing AWS Polly client with region: {}", config.aws_region);
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;
    let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));

    let openai_client = Arc::new(OpenAIClient::with_config(
        OpenAIConfig::new().with_api_key(config.openai_api_key.clone()),
    ));

    if config.elevenlabs_api_key.is_empty() {
        tracing::warn!("ELEVENLABS_API_KEY not set, premium synthesis will fail over");
    }

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Repositories and vendor adapters
    tracing::info!("Instantiating repositories...");
    let cache_repo = Arc::new(PgParagraphCacheRepository::new(pool.clone()));
    let subscription_repo = Arc::new(PgSubscriptionRepository::new(pool.clone()));
    let custom_voice_repo = Arc::new(PgCustomVoiceRepository::new(pool.clone()));
    let storage = Arc::new(LocalAudioStorage::new(
        config.audio_storage_dir.clone(),
        config.audio_base_url.clone(),
    ));
    let providers = ProviderSet {
        elevenlabs: Arc::new(ElevenLabsTtsRepository::new(
            reqwest::Client::new(),
            config.elevenlabs_api_key.clone(),
            config.elevenlabs_model.clone(),
        )),
        openai: Arc::new(OpenAiTtsRepository::new(
            openai_client,
            config.openai_tts_model.clone(),
        )),
        polly: Arc::new(PollyTtsRepository::new(polly_client)),
    };

    // 2. Shared breaker registry, one breaker per provider
    let breakers = config.breaker_overrides.iter().fold(
        CircuitBreakerRegistry::new(config.breaker_config()),
        |registry, (name, breaker_config)| registry.with_override(name.clone(), *breaker_config),
    );

    // 3. Services
    tracing::info!("Instantiating services...");
    let tts_service = Arc::new(TtsService::new(
        VoiceResolver::new(custom_voice_repo),
        QuotaGate::new(subscription_repo, config.premium_voices_per_story),
        ParagraphCache::new(cache_repo, config.tts_cache_enabled),
        Arc::new(breakers),
        providers,
        storage,
        config.synthesis_settings(),
    ));
    let jwt_manager = Arc::new(JwtManager::new(config.jwt_secret.clone()));

    // 4. Controllers
    tracing::info!("Instantiating controllers...");
    let tts_controller = Arc::new(TtsController::new(tts_service));

    let app = create_router(
        pool,
        jwt_manager,
        tts_controller,
        Path::new(&config.audio_storage_dir),
    );
    start_http_server(app, config).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "narration_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "narration_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
