use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::controllers::tts::TtsController;
use crate::infrastructure::db::{check_connection, DbPool};

#[derive(Clone)]
pub struct HealthState {
    pub pool: Arc<DbPool>,
    pub tts_controller: Arc<TtsController>,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn health_ready(State(state): State<HealthState>) -> impl IntoResponse {
    let tts = state.tts_controller.status();
    let tts_status = if tts.degraded { "degraded" } else { "available" };

    match check_connection(&state.pool).await {
        Ok(latency) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "database": "connected",
                "database_latency_ms": latency.as_millis() as u64,
                "tts": tts_status,
                "providers": tts.providers
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed to reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "database": "disconnected",
                    "tts": tts_status,
                    "providers": tts.providers
                })),
            )
        }
    }
}
