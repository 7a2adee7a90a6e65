use super::provider::TtsProvider;
use crate::infrastructure::repositories::CustomVoiceRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_VOICE_ID: &str = "luna";

/// Premium-vendor synthesis knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

/// Built-in narrator voice with per-provider parameters
#[derive(Debug, PartialEq)]
pub struct SystemVoice {
    pub id: &'static str,
    pub elevenlabs_voice_id: &'static str,
    pub openai_voice: &'static str,
    pub polly_voice: &'static str,
    pub settings: Option<VoiceSettings>,
}

pub static SYSTEM_VOICES: &[SystemVoice] = &[
    SystemVoice {
        id: "luna",
        elevenlabs_voice_id: "21m00Tcm4TlvDq8ikWAM",
        openai_voice: "nova",
        polly_voice: "Joanna",
        settings: Some(VoiceSettings {
            stability: 0.6,
            similarity_boost: 0.75,
            style: 0.2,
            use_speaker_boost: true,
        }),
    },
    SystemVoice {
        id: "atlas",
        elevenlabs_voice_id: "onwK4e9ZLuTAKqWW03F9",
        openai_voice: "onyx",
        polly_voice: "Matthew",
        settings: Some(VoiceSettings {
            stability: 0.7,
            similarity_boost: 0.75,
            style: 0.1,
            use_speaker_boost: true,
        }),
    },
    SystemVoice {
        id: "willow",
        elevenlabs_voice_id: "pFZP5JQG7iQjIQuC4Bku",
        openai_voice: "shimmer",
        polly_voice: "Amy",
        settings: Some(VoiceSettings {
            stability: 0.55,
            similarity_boost: 0.8,
            style: 0.3,
            use_speaker_boost: true,
        }),
    },
    SystemVoice {
        id: "finn",
        elevenlabs_voice_id: "IKne3meq5aSn9XLyUdCD",
        openai_voice: "echo",
        polly_voice: "Justin",
        settings: None,
    },
    SystemVoice {
        id: "sage",
        elevenlabs_voice_id: "pqHfZKP75CvOlQylNhV4",
        openai_voice: "fable",
        polly_voice: "Brian",
        settings: None,
    },
    SystemVoice {
        id: "ember",
        elevenlabs_voice_id: "XrExE9yKIg1WjnnlVkGX",
        openai_voice: "alloy",
        polly_voice: "Ivy",
        settings: None,
    },
];

/// Renamed voices and their replacement system voice ids
const LEGACY_VOICE_NAMES: &[(&str, &str)] = &[
    ("rachel", "luna"),
    ("storyteller", "luna"),
    ("daniel", "atlas"),
    ("lily", "willow"),
    ("charlie", "finn"),
    ("bill", "sage"),
    ("grandpa", "sage"),
    ("matilda", "ember"),
];

pub fn find_system_voice(id: &str) -> Option<&'static SystemVoice> {
    SYSTEM_VOICES.iter().find(|voice| voice.id == id)
}

fn default_system_voice() -> &'static SystemVoice {
    &SYSTEM_VOICES[0]
}

/// User-cloned voice stored alongside the user's account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomVoice {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub elevenlabs_voice_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a requested voice identifier refers to
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalVoice {
    System(&'static SystemVoice),
    Legacy {
        name: String,
        replacement: &'static SystemVoice,
    },
    Custom(String),
}

/// Voice parameters for every provider, resolved once per request
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVoice {
    /// Canonical id used for caching and quota accounting
    pub voice_id: String,
    pub elevenlabs_voice_id: String,
    pub openai_voice: String,
    pub polly_voice: String,
    pub settings: Option<VoiceSettings>,
}

impl ResolvedVoice {
    fn from_system(voice: &SystemVoice) -> Self {
        Self {
            voice_id: voice.id.to_string(),
            elevenlabs_voice_id: voice.elevenlabs_voice_id.to_string(),
            openai_voice: voice.openai_voice.to_string(),
            polly_voice: voice.polly_voice.to_string(),
            settings: voice.settings,
        }
    }

    /// Vendor voice parameter for the given provider
    pub fn param_for(&self, provider: TtsProvider) -> &str {
        match provider {
            TtsProvider::ElevenLabs => &self.elevenlabs_voice_id,
            TtsProvider::OpenAi => &self.openai_voice,
            TtsProvider::Polly => &self.polly_voice,
        }
    }
}

pub struct VoiceResolver {
    custom_voices: Arc<dyn CustomVoiceRepository>,
    legacy_names: HashMap<String, &'static SystemVoice>,
}

impl VoiceResolver {
    pub fn new(custom_voices: Arc<dyn CustomVoiceRepository>) -> Self {
        let legacy_names = LEGACY_VOICE_NAMES
            .iter()
            .filter_map(|(old, new)| find_system_voice(new).map(|voice| (old.to_string(), voice)))
            .collect();

        Self {
            custom_voices,
            legacy_names,
        }
    }

    /// Add extra legacy-name migrations (old name → system voice id)
    pub fn with_legacy_names(mut self, names: HashMap<String, String>) -> Self {
        for (old, new) in names {
            match find_system_voice(&new) {
                Some(voice) => {
                    self.legacy_names.insert(old.to_lowercase(), voice);
                }
                None => {
                    tracing::warn!(
                        legacy_name = %old,
                        replacement = %new,
                        "Ignoring legacy voice migration to unknown system voice"
                    );
                }
            }
        }
        self
    }

    pub fn classify(&self, voice_id: &str) -> CanonicalVoice {
        if let Some(voice) = find_system_voice(voice_id) {
            return CanonicalVoice::System(voice);
        }

        if let Some(voice) = self.legacy_names.get(&voice_id.to_lowercase()) {
            return CanonicalVoice::Legacy {
                name: voice_id.to_string(),
                replacement: voice,
            };
        }

        CanonicalVoice::Custom(voice_id.to_string())
    }

    /// Canonical id without touching the custom voice store
    pub fn canonical_voice_id(&self, voice_id: &str) -> String {
        match self.classify(voice_id) {
            CanonicalVoice::System(voice) => voice.id.to_string(),
            CanonicalVoice::Legacy { replacement, .. } => replacement.id.to_string(),
            CanonicalVoice::Custom(reference) => reference,
        }
    }

    /// Resolve any voice identifier. Never fails: unknown voices fall back
    /// to the default system voice.
    pub async fn resolve(&self, voice_id: &str) -> ResolvedVoice {
        match self.classify(voice_id) {
            CanonicalVoice::System(voice) => ResolvedVoice::from_system(voice),
            CanonicalVoice::Legacy { name, replacement } => {
                tracing::debug!(
                    legacy_name = %name,
                    voice_id = replacement.id,
                    "Migrated legacy voice name"
                );
                ResolvedVoice::from_system(replacement)
            }
            CanonicalVoice::Custom(reference) => self.resolve_custom(&reference).await,
        }
    }

    async fn resolve_custom(&self, reference: &str) -> ResolvedVoice {
        let fallback = default_system_voice();

        match self.custom_voices.find_by_id_or_name(reference).await {
            Ok(Some(custom)) => match custom.elevenlabs_voice_id.filter(|id| !id.is_empty()) {
                Some(elevenlabs_voice_id) => ResolvedVoice {
                    voice_id: custom.id.to_string(),
                    elevenlabs_voice_id,
                    openai_voice: fallback.openai_voice.to_string(),
                    polly_voice: fallback.polly_voice.to_string(),
                    settings: None,
                },
                None => {
                    tracing::warn!(
                        voice = %reference,
                        custom_voice_id = %custom.id,
                        "Custom voice has no premium voice id, using default voice"
                    );
                    ResolvedVoice::from_system(fallback)
                }
            },
            Ok(None) => {
                tracing::warn!(voice = %reference, "Unknown voice, using default voice");
                ResolvedVoice::from_system(fallback)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    voice = %reference,
                    "Custom voice lookup failed, using default voice"
                );
                ResolvedVoice::from_system(fallback)
            }
        }
    }
}
