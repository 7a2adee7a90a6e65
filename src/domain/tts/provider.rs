use serde::{Deserialize, Serialize};

/// Speech vendors in fallback priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    /// Premium vendor, gated by subscription quota
    #[serde(rename = "elevenlabs")]
    ElevenLabs,
    #[serde(rename = "openai")]
    OpenAi,
    Polly,
}

impl TtsProvider {
    /// Fixed fallback chain: premium → secondary → tertiary
    pub const CHAIN: [TtsProvider; 3] = [
        TtsProvider::ElevenLabs,
        TtsProvider::OpenAi,
        TtsProvider::Polly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TtsProvider::ElevenLabs => "elevenlabs",
            TtsProvider::OpenAi => "openai",
            TtsProvider::Polly => "polly",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, TtsProvider::ElevenLabs)
    }

    /// Next provider in the downgrade chain, if any
    pub fn next(&self) -> Option<TtsProvider> {
        match self {
            TtsProvider::ElevenLabs => Some(TtsProvider::OpenAi),
            TtsProvider::OpenAi => Some(TtsProvider::Polly),
            TtsProvider::Polly => None,
        }
    }

    /// This provider followed by every provider below it
    pub fn downgrade_chain(self) -> impl Iterator<Item = TtsProvider> {
        std::iter::successors(Some(self), |p| p.next())
    }
}

impl std::fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TtsProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elevenlabs" => Ok(TtsProvider::ElevenLabs),
            "openai" => Ok(TtsProvider::OpenAi),
            "polly" => Ok(TtsProvider::Polly),
            other => Err(format!("unknown TTS provider: {}", other)),
        }
    }
}

/// Where the audio of a synthesis result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    #[serde(rename = "elevenlabs")]
    ElevenLabs,
    #[serde(rename = "openai")]
    OpenAi,
    Polly,
    Cache,
}

impl From<TtsProvider> for AudioSource {
    fn from(provider: TtsProvider) -> Self {
        match provider {
            TtsProvider::ElevenLabs => AudioSource::ElevenLabs,
            TtsProvider::OpenAi => AudioSource::OpenAi,
            TtsProvider::Polly => AudioSource::Polly,
        }
    }
}
