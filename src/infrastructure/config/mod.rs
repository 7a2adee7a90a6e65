use crate::domain::tts::{BreakerConfig, SynthesisSettings, TtsProvider};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Vendors
    pub aws_region: String,
    pub openai_api_key: String,
    pub openai_tts_model: String,
    pub elevenlabs_api_key: String,
    pub elevenlabs_model: String,
    // Audio storage
    pub audio_storage_dir: String,
    pub audio_base_url: String,
    // Synthesis
    pub tts_cache_enabled: bool,
    pub max_text_length: usize,
    pub paragraph_target_words: usize,
    pub max_concurrent_generations: usize,
    pub max_paragraphs: usize,
    pub premium_voices_per_story: usize,
    // Circuit breakers
    pub breaker_failure_threshold: u32,
    pub breaker_cooldown_secs: u64,
    #[serde(skip)]
    pub breaker_overrides: HashMap<String, BreakerConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let breaker_failure_threshold: u32 = var_or("BREAKER_FAILURE_THRESHOLD", "5").parse()?;
        let breaker_cooldown_secs: u64 = var_or("BREAKER_COOLDOWN_SECS", "60").parse()?;

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: var_or("DATABASE_MAX_CONNECTIONS", "10").parse()?,
            host: var_or("HOST", "0.0.0.0"),
            port: var_or("PORT", "8080").parse()?,
            jwt_secret: env::var("JWT_SECRET")?,
            environment: match var_or("ENVIRONMENT", "development").as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match var_or("LOG_FORMAT", "pretty").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            aws_region: var_or("AWS_REGION", "eu-west-1"),
            openai_api_key: var_or("OPENAI_API_KEY", ""),
            openai_tts_model: var_or("OPENAI_TTS_MODEL", "tts-1"),
            elevenlabs_api_key: var_or("ELEVENLABS_API_KEY", ""),
            elevenlabs_model: var_or("ELEVENLABS_MODEL", "eleven_multilingual_v2"),
            audio_storage_dir: var_or("AUDIO_STORAGE_DIR", "./audio"),
            audio_base_url: var_or("AUDIO_BASE_URL", "http://localhost:8080/audio"),
            tts_cache_enabled: var_or("TTS_CACHE_ENABLED", "false").to_lowercase() == "true",
            max_text_length: var_or("TTS_MAX_TEXT_LENGTH", "5000").parse()?,
            paragraph_target_words: var_or("TTS_PARAGRAPH_TARGET_WORDS", "30").parse()?,
            max_concurrent_generations: var_or("TTS_MAX_CONCURRENT_GENERATIONS", "5").parse()?,
            max_paragraphs: var_or("TTS_MAX_PARAGRAPHS", "50").parse()?,
            premium_voices_per_story: var_or("TTS_PREMIUM_VOICES_PER_STORY", "2").parse()?,
            breaker_failure_threshold,
            breaker_cooldown_secs,
            breaker_overrides: Self::breaker_overrides_from_env(
                breaker_failure_threshold,
                breaker_cooldown_secs,
            )?,
        };

        Ok(config)
    }

    /// Per-provider breaker tuning, e.g. `ELEVENLABS_BREAKER_FAILURE_THRESHOLD`
    fn breaker_overrides_from_env(
        default_threshold: u32,
        default_cooldown_secs: u64,
    ) -> Result<HashMap<String, BreakerConfig>, Box<dyn std::error::Error>> {
        let mut overrides = HashMap::new();

        for provider in TtsProvider::CHAIN {
            let prefix = provider.as_str().to_uppercase();
            let threshold = env::var(format!("{}_BREAKER_FAILURE_THRESHOLD", prefix)).ok();
            let cooldown = env::var(format!("{}_BREAKER_COOLDOWN_SECS", prefix)).ok();

            if threshold.is_none() && cooldown.is_none() {
                continue;
            }

            let failure_threshold = match threshold {
                Some(value) => value.parse()?,
                None => default_threshold,
            };
            let cooldown_secs = match cooldown {
                Some(value) => value.parse()?,
                None => default_cooldown_secs,
            };

            overrides.insert(
                provider.as_str().to_string(),
                BreakerConfig {
                    failure_threshold,
                    cooldown: Duration::from_secs(cooldown_secs),
                },
            );
        }

        Ok(overrides)
    }

    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            cooldown: Duration::from_secs(self.breaker_cooldown_secs),
        }
    }

    pub fn synthesis_settings(&self) -> SynthesisSettings {
        SynthesisSettings {
            max_text_length: self.max_text_length,
            paragraph_target_words: self.paragraph_target_words,
            max_concurrent_generations: self.max_concurrent_generations,
            max_paragraphs: self.max_paragraphs,
            elevenlabs_model: self.elevenlabs_model.clone(),
        }
    }
}
