use super::tts_repository::TtsRepository;
use crate::domain::tts::text::split_into_batches;
use crate::domain::tts::VoiceSettings;
use async_trait::async_trait;
use aws_sdk_polly::{
    error::DisplayErrorContext,
    types::{Engine, OutputFormat, TextType, VoiceId},
    Client as PollyClient,
};
use futures::future::try_join_all;
use std::sync::Arc;

/// Polly bills and limits plain text at 3000 characters per request
const MAX_BATCH_SIZE: usize = 3000;

const SAMPLE_RATE: &str = "24000";

/// Voices served by the neural engine; anything else falls back to standard
const NEURAL_VOICES: &[&str] = &[
    "Joanna", "Matthew", "Amy", "Justin", "Brian", "Ivy", "Kendra", "Kimberly", "Salli", "Joey",
    "Kevin", "Emma", "Olivia", "Ruth", "Stephen",
];

fn engine_for(voice: &str) -> Engine {
    if NEURAL_VOICES.iter().any(|v| v.eq_ignore_ascii_case(voice)) {
        Engine::Neural
    } else {
        Engine::Standard
    }
}

/// AWS Polly adapter (tertiary provider)
pub struct PollyTtsRepository {
    polly_client: Arc<PollyClient>,
}

impl PollyTtsRepository {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    async fn synthesize_batch(&self, text: &str, voice: &str, engine: Engine) -> Result<Vec<u8>, String> {
        let output = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .text_type(TextType::Text)
            .voice_id(VoiceId::from(voice))
            .engine(engine.clone())
            .output_format(OutputFormat::Mp3)
            .sample_rate(SAMPLE_RATE)
            .send()
            .await
            .map_err(|e| {
                let detail = DisplayErrorContext(&e).to_string();
                tracing::error!(
                    error = %detail,
                    voice = voice,
                    engine = ?engine,
                    text_length = text.len(),
                    "Polly synthesize_speech failed"
                );
                format!("Polly error: {}", detail)
            })?;

        let audio = output
            .audio_stream
            .collect()
            .await
            .map_err(|e| format!("Failed to read Polly audio stream: {}", e))?;

        Ok(audio.into_bytes().to_vec())
    }
}

#[async_trait]
impl TtsRepository for PollyTtsRepository {
    async fn generate_audio(
        &self,
        text: &str,
        voice: &str,
        _model: Option<&str>,
        _settings: Option<&VoiceSettings>,
    ) -> Result<Vec<u8>, String> {
        let engine = engine_for(voice);
        let batches = split_into_batches(text, MAX_BATCH_SIZE);

        tracing::debug!(
            voice = voice,
            engine = ?engine,
            batches = batches.len(),
            "Synthesizing with Polly"
        );

        // Batches run concurrently; results come back in input order
        let parts = try_join_all(
            batches
                .iter()
                .map(|batch| self.synthesize_batch(batch, voice, engine.clone())),
        )
        .await?;

        Ok(parts.concat())
    }
}
