pub mod batch;
pub mod breaker;
pub mod cache;
pub mod dto;
pub mod error;
pub mod provider;
pub mod quota;
pub mod service;
pub mod text;
pub mod voice;

pub use batch::{BatchItem, BatchOutcome, ProviderStatus};
pub use breaker::{BreakerConfig, BreakerPermit, BreakerSnapshot, CircuitBreaker, CircuitBreakerRegistry, CircuitState};
pub use cache::{ParagraphCache, ParagraphCacheKey};
pub use error::TtsServiceError;
pub use provider::{AudioSource, TtsProvider};
pub use quota::QuotaGate;
pub use service::{ProviderSet, SynthesisOptions, SynthesisResult, SynthesisSettings, TtsService, TtsServiceApi};
pub use voice::{CustomVoice, ResolvedVoice, VoiceResolver, VoiceSettings, DEFAULT_VOICE_ID};
