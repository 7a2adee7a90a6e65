use super::tts_repository::TtsRepository;
use crate::domain::tts::text::split_into_batches;
use crate::domain::tts::VoiceSettings;
use async_trait::async_trait;
use serde::Serialize;

/// ElevenLabs accepts up to 5000 characters per request on multilingual models
const MAX_BATCH_SIZE: usize = 5000;

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_settings: Option<&'a VoiceSettings>,
}

/// ElevenLabs implementation of TTS repository (premium provider)
pub struct ElevenLabsTtsRepository {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl ElevenLabsTtsRepository {
    pub fn new(http: reqwest::Client, api_key: String, default_model: String) -> Self {
        Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn speech_url(&self, voice: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}?output_format=mp3_44100_128",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(voice)
        )
    }

    /// Call the ElevenLabs text-to-speech endpoint for a single text batch
    async fn call_elevenlabs(
        &self,
        text: &str,
        voice: &str,
        model: &str,
        settings: Option<&VoiceSettings>,
    ) -> Result<Vec<u8>, String> {
        tracing::debug!(
            model = %model,
            voice = voice,
            text_length = text.len(),
            "Calling ElevenLabs text-to-speech"
        );

        let response = self
            .http
            .post(self.speech_url(voice))
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: model,
                voice_settings: settings,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, voice = voice, "ElevenLabs request failed");
                format!("ElevenLabs request error: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                voice = voice,
                body = %body,
                "ElevenLabs returned an error"
            );
            return Err(format!("ElevenLabs error {}: {}", status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read ElevenLabs audio: {}", e))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TtsRepository for ElevenLabsTtsRepository {
    async fn generate_audio(
        &self,
        text: &str,
        voice: &str,
        model: Option<&str>,
        settings: Option<&VoiceSettings>,
    ) -> Result<Vec<u8>, String> {
        let model = model.unwrap_or(&self.default_model);
        let batches = split_into_batches(text, MAX_BATCH_SIZE);

        let mut merged_audio = Vec::new();
        for batch in &batches {
            let audio_data = self.call_elevenlabs(batch, voice, model, settings).await?;
            merged_audio.extend(audio_data);
        }

        Ok(merged_audio)
    }
}
