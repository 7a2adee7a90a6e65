use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::tts::{
        dto::{NarrateStoryRequest, ProviderStatusResponse, SynthesizeRequest},
        BatchOutcome, CircuitState, SynthesisOptions, SynthesisResult, TtsServiceApi,
    },
    error::{AppError, AppResult},
    infrastructure::auth::AuthUser,
};

pub struct TtsController {
    tts_service: Arc<dyn TtsServiceApi>,
}

impl TtsController {
    pub fn new(tts_service: Arc<dyn TtsServiceApi>) -> Self {
        Self { tts_service }
    }

    /// POST /api/stories/:story_id/tts - Synthesize a single piece of text
    pub async fn synthesize(
        State(controller): State<Arc<TtsController>>,
        Path(story_id): Path<Uuid>,
        auth_user: Option<Extension<AuthUser>>,
        Json(request): Json<SynthesizeRequest>,
    ) -> AppResult<Json<SynthesisResult>> {
        if request.text.trim().is_empty() {
            return Err(AppError::BadRequest("Text cannot be empty".to_string()));
        }

        let user_id = auth_user.map(|Extension(user)| user.user_id);
        let options = SynthesisOptions {
            provider_override: request.provider,
        };

        let result = controller
            .tts_service
            .synthesize(
                story_id,
                &request.text,
                request.voice_id.as_deref(),
                user_id,
                options,
            )
            .await?;

        Ok(Json(result))
    }

    /// POST /api/stories/:story_id/narration - Narrate a whole story with one voice
    pub async fn narrate_story(
        State(controller): State<Arc<TtsController>>,
        Path(story_id): Path<Uuid>,
        auth_user: Option<Extension<AuthUser>>,
        Json(request): Json<NarrateStoryRequest>,
    ) -> AppResult<Json<BatchOutcome>> {
        if request.text.trim().is_empty() {
            return Err(AppError::BadRequest("Story text cannot be empty".to_string()));
        }

        let user_id = auth_user.map(|Extension(user)| user.user_id);

        let outcome = controller
            .tts_service
            .synthesize_story(story_id, &request.text, request.voice_id.as_deref(), user_id)
            .await;

        Ok(Json(outcome))
    }

    /// GET /api/tts/providers - Breaker state of every provider
    pub async fn provider_status(
        State(controller): State<Arc<TtsController>>,
    ) -> Json<ProviderStatusResponse> {
        Json(controller.status())
    }

    pub fn status(&self) -> ProviderStatusResponse {
        let providers = self.tts_service.provider_snapshots();
        let degraded = providers
            .iter()
            .any(|snapshot| snapshot.state == CircuitState::Open);

        ProviderStatusResponse {
            degraded,
            providers,
        }
    }
}
