use super::breaker::BreakerSnapshot;
use super::provider::TtsProvider;
use serde::{Deserialize, Serialize};

/// Request for POST /api/stories/:story_id/tts
#[derive(Debug, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    /// Force a single provider, no fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<TtsProvider>,
}

/// Request for POST /api/stories/:story_id/narration
#[derive(Debug, Serialize, Deserialize)]
pub struct NarrateStoryRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

/// Response for GET /api/tts/providers
#[derive(Debug, Serialize)]
pub struct ProviderStatusResponse {
    pub degraded: bool,
    pub providers: Vec<BreakerSnapshot>,
}
