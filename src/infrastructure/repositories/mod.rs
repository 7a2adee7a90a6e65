pub mod audio_storage;
pub mod custom_voice_repository;
pub mod elevenlabs_tts_repository;
pub mod openai_tts_repository;
pub mod paragraph_cache_repository;
pub mod polly_tts_repository;
pub mod subscription_repository;
pub mod tts_repository;

pub use audio_storage::{AudioStorage, LocalAudioStorage};
pub use custom_voice_repository::{CustomVoiceRepository, PgCustomVoiceRepository};
pub use elevenlabs_tts_repository::ElevenLabsTtsRepository;
pub use openai_tts_repository::OpenAiTtsRepository;
pub use paragraph_cache_repository::{
    ParagraphCacheEntry, ParagraphCacheRepository, PgParagraphCacheRepository,
};
pub use polly_tts_repository::PollyTtsRepository;
pub use subscription_repository::{PgSubscriptionRepository, PremiumTrial, SubscriptionRepository};
pub use tts_repository::TtsRepository;
