use crate::domain::tts::VoiceSettings;
use async_trait::async_trait;

/// Vendor adapter for speech synthesis (ElevenLabs, OpenAI, AWS Polly).
///
/// Implementations are responsible for:
/// - Handling provider-specific text length limitations
/// - Splitting text into batches if needed
/// - Merging audio chunks into a single audio stream
///
/// Adapters never retry: fallback and circuit breaking belong to the caller.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Synthesize text with a vendor-specific voice
    ///
    /// Returns merged audio data ready for playback (MP3 format)
    ///
    /// # Arguments
    /// * `text` - The text to synthesize
    /// * `voice` - The vendor's voice identifier
    /// * `model` - Optional vendor model override
    /// * `settings` - Optional voice tuning (honoured by the premium vendor)
    ///
    /// # Errors
    /// Returns error if synthesis fails or provider is unavailable
    async fn generate_audio(
        &self,
        text: &str,
        voice: &str,
        model: Option<&str>,
        settings: Option<&VoiceSettings>,
    ) -> Result<Vec<u8>, String>;
}
