use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;
use crate::{
    controllers::{
        health::{self, HealthState},
        tts::TtsController,
    },
    domain::auth::JwtManager,
    infrastructure::auth::{optional_auth_middleware, request_id_middleware},
};

/// Build the application router with all routes configured
pub fn create_router(
    pool: Arc<DbPool>,
    jwt_manager: Arc<JwtManager>,
    tts_controller: Arc<TtsController>,
    audio_dir: &Path,
) -> Router {
    // Story routes (auth optional: anonymous callers never get premium)
    let story_routes = Router::new()
        .route("/api/stories/:story_id/tts", post(TtsController::synthesize))
        .route(
            "/api/stories/:story_id/narration",
            post(TtsController::narrate_story),
        )
        .with_state(tts_controller.clone())
        .layer(middleware::from_fn_with_state(
            jwt_manager,
            optional_auth_middleware,
        ));

    // Provider status (public)
    let provider_routes = Router::new()
        .route("/api/tts/providers", get(TtsController::provider_status))
        .with_state(tts_controller.clone());

    let health_state = HealthState {
        pool,
        tts_controller,
    };

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(health_state)
        .merge(story_routes)
        .merge(provider_routes)
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(CorsLayer::permissive()),
        )
}

/// Start the HTTP server
pub async fn start_http_server(
    app: Router,
    config: Arc<Config>,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
