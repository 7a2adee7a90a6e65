use super::batch::BatchOutcome;
use super::breaker::{BreakerPermit, BreakerSnapshot, CircuitBreakerRegistry};
use super::cache::{ParagraphCache, ParagraphCacheKey};
use super::error::TtsServiceError;
use super::provider::{AudioSource, TtsProvider};
use super::quota::QuotaGate;
use super::text::text_hash;
use super::voice::{ResolvedVoice, VoiceResolver, DEFAULT_VOICE_ID};
use crate::infrastructure::repositories::{AudioStorage, TtsRepository};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Tunables for both synthesis modes
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub max_text_length: usize,
    pub paragraph_target_words: usize,
    pub max_concurrent_generations: usize,
    pub max_paragraphs: usize,
    pub elevenlabs_model: String,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            max_text_length: 5000,
            paragraph_target_words: 30,
            max_concurrent_generations: 5,
            max_paragraphs: 50,
            elevenlabs_model: "eleven_multilingual_v2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SynthesisOptions {
    /// Use only this provider, failing instead of falling back
    pub provider_override: Option<TtsProvider>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub audio_url: String,
    pub provider: AudioSource,
}

/// One adapter per vendor
#[derive(Clone)]
pub struct ProviderSet {
    pub elevenlabs: Arc<dyn TtsRepository>,
    pub openai: Arc<dyn TtsRepository>,
    pub polly: Arc<dyn TtsRepository>,
}

impl ProviderSet {
    pub fn get(&self, provider: TtsProvider) -> &Arc<dyn TtsRepository> {
        match provider {
            TtsProvider::ElevenLabs => &self.elevenlabs,
            TtsProvider::OpenAi => &self.openai,
            TtsProvider::Polly => &self.polly,
        }
    }
}

/// Per-request state resolved once: voice parameters and premium quota
#[derive(Debug, Clone)]
pub(super) struct SynthesisContext {
    pub story_id: Uuid,
    pub user_id: Option<Uuid>,
    pub voice: ResolvedVoice,
    pub is_premium_user: bool,
    pub premium_allowed: bool,
}

pub struct TtsService {
    pub(super) resolver: VoiceResolver,
    pub(super) quota: QuotaGate,
    pub(super) cache: ParagraphCache,
    pub(super) breakers: Arc<CircuitBreakerRegistry>,
    pub(super) providers: ProviderSet,
    pub(super) storage: Arc<dyn AudioStorage>,
    pub(super) settings: SynthesisSettings,
}

impl TtsService {
    pub fn new(
        resolver: VoiceResolver,
        quota: QuotaGate,
        cache: ParagraphCache,
        breakers: Arc<CircuitBreakerRegistry>,
        providers: ProviderSet,
        storage: Arc<dyn AudioStorage>,
        settings: SynthesisSettings,
    ) -> Self {
        Self {
            resolver,
            quota,
            cache,
            breakers,
            providers,
            storage,
            settings,
        }
    }
}

#[async_trait]
pub trait TtsServiceApi: Send + Sync {
    /// Synthesize one piece of text for a story
    ///
    /// This operation:
    /// - Rejects text over the configured maximum length
    /// - Returns cached audio for identical (normalized) text when present
    /// - Walks premium → secondary → tertiary, skipping providers that are
    ///   not allowed by quota or whose breaker is open
    ///
    /// With `provider_override` only that provider is attempted.
    async fn synthesize(
        &self,
        story_id: Uuid,
        text: &str,
        voice_id: Option<&str>,
        user_id: Option<Uuid>,
        options: SynthesisOptions,
    ) -> Result<SynthesisResult, TtsServiceError>;

    /// Narrate a whole story with a single provider for every paragraph.
    /// Never fails: paragraphs that could not be generated have no URL.
    async fn synthesize_story(
        &self,
        story_id: Uuid,
        full_text: &str,
        voice_id: Option<&str>,
        user_id: Option<Uuid>,
    ) -> BatchOutcome;

    /// Current breaker state of every provider
    fn provider_snapshots(&self) -> Vec<BreakerSnapshot>;
}

#[async_trait]
impl TtsServiceApi for TtsService {
    async fn synthesize(
        &self,
        story_id: Uuid,
        text: &str,
        voice_id: Option<&str>,
        user_id: Option<Uuid>,
        options: SynthesisOptions,
    ) -> Result<SynthesisResult, TtsServiceError> {
        let length = text.chars().count();
        if length > self.settings.max_text_length {
            return Err(TtsServiceError::TextTooLong {
                length,
                max: self.settings.max_text_length,
            });
        }
        if text.trim().is_empty() {
            return Err(TtsServiceError::Invalid("Text cannot be empty".to_string()));
        }

        let requested_voice = voice_id.unwrap_or(DEFAULT_VOICE_ID);
        let hash = text_hash(text);

        tracing::info!(
            story_id = %story_id,
            user_id = ?user_id,
            voice = %requested_voice,
            text_length = length,
            provider_override = ?options.provider_override,
            "TTS synthesis request"
        );

        // Cache is consulted before any quota or breaker work
        let cache_voice_id = self.resolver.canonical_voice_id(requested_voice);
        let cached = match options.provider_override {
            Some(provider) => {
                let key = ParagraphCacheKey::from_hash(story_id, hash.clone(), &cache_voice_id, provider);
                self.cache.lookup(&key).await
            }
            None => self
                .cache
                .lookup_any(story_id, &hash, &cache_voice_id)
                .await
                .map(|(_, url)| url),
        };
        if let Some(audio_url) = cached {
            tracing::info!(story_id = %story_id, text_hash = %hash, "TTS cache hit");
            return Ok(SynthesisResult {
                audio_url,
                provider: AudioSource::Cache,
            });
        }

        let ctx = self.prepare(story_id, requested_voice, user_id).await;

        match options.provider_override {
            Some(provider) => self.synthesize_with_provider(&ctx, text, &hash, provider).await,
            None => self.synthesize_with_fallback(&ctx, text, &hash).await,
        }
    }

    async fn synthesize_story(
        &self,
        story_id: Uuid,
        full_text: &str,
        voice_id: Option<&str>,
        user_id: Option<Uuid>,
    ) -> BatchOutcome {
        self.narrate_story(story_id, full_text, voice_id, user_id).await
    }

    fn provider_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers.provider_snapshots()
    }
}

impl TtsService {
    /// Resolve voice parameters and premium quota for a request
    pub(super) async fn prepare(
        &self,
        story_id: Uuid,
        voice_id: &str,
        user_id: Option<Uuid>,
    ) -> SynthesisContext {
        let voice = self.resolver.resolve(voice_id).await;
        let is_premium_user = self.quota.is_premium_user(user_id).await;
        let premium_allowed = self
            .quota
            .allows_premium(user_id, story_id, &voice.voice_id, is_premium_user)
            .await;

        SynthesisContext {
            story_id,
            user_id,
            voice,
            is_premium_user,
            premium_allowed,
        }
    }

    /// Attempt exactly one provider. An open breaker fails immediately.
    pub(super) async fn synthesize_with_provider(
        &self,
        ctx: &SynthesisContext,
        text: &str,
        hash: &str,
        provider: TtsProvider,
    ) -> Result<SynthesisResult, TtsServiceError> {
        if provider.is_premium() && !ctx.premium_allowed {
            return Err(TtsServiceError::ProviderNotAllowed(provider));
        }

        let Some(permit) = self.breakers.for_provider(provider).try_acquire() else {
            return Err(TtsServiceError::ProviderUnavailable(provider));
        };

        self.generate(ctx, text, hash, provider, permit).await
    }

    async fn synthesize_with_fallback(
        &self,
        ctx: &SynthesisContext,
        text: &str,
        hash: &str,
    ) -> Result<SynthesisResult, TtsServiceError> {
        for provider in TtsProvider::CHAIN {
            if provider.is_premium() && !ctx.premium_allowed {
                tracing::debug!(provider = %provider, "Premium provider not allowed, skipping");
                continue;
            }

            let Some(permit) = self.breakers.for_provider(provider).try_acquire() else {
                tracing::warn!(provider = %provider, "Circuit open, skipping provider");
                continue;
            };

            match self.generate(ctx, text, hash, provider, permit).await {
                Ok(result) => return Ok(result),
                // Storage failures are not the vendor's fault; another vendor won't help
                Err(e @ TtsServiceError::Dependency(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        provider = %provider,
                        story_id = %ctx.story_id,
                        "Provider failed, falling back"
                    );
                }
            }
        }

        tracing::error!(
            story_id = %ctx.story_id,
            voice_id = %ctx.voice.voice_id,
            "All TTS providers failed or unavailable"
        );
        Err(TtsServiceError::NoProviderAvailable)
    }

    /// Call the vendor, drive its breaker, upload the audio and cache the URL
    async fn generate(
        &self,
        ctx: &SynthesisContext,
        text: &str,
        hash: &str,
        provider: TtsProvider,
        permit: BreakerPermit,
    ) -> Result<SynthesisResult, TtsServiceError> {
        let start_time = std::time::Instant::now();
        let voice_param = ctx.voice.param_for(provider);
        let (model, settings) = if provider.is_premium() {
            (
                Some(self.settings.elevenlabs_model.as_str()),
                ctx.voice.settings.as_ref(),
            )
        } else {
            (None, None)
        };

        let result = self
            .providers
            .get(provider)
            .generate_audio(text, voice_param, model, settings)
            .await
            .and_then(|audio| {
                if audio.is_empty() {
                    Err(format!("{} returned empty audio", provider))
                } else {
                    Ok(audio)
                }
            });

        let audio = match result {
            Ok(audio) => {
                permit.record_success();
                audio
            }
            Err(message) => {
                permit.record_failure(&message);
                return Err(TtsServiceError::ProviderFailed { provider, message });
            }
        };

        if provider.is_premium() {
            // Detached: usage bookkeeping must not delay or fail synthesis
            drop(self.quota.track_premium_usage(
                ctx.user_id,
                ctx.story_id,
                &ctx.voice.voice_id,
                ctx.is_premium_user,
            ));
        }

        let filename = format!(
            "stories/{}/{}_{}_{}.mp3",
            ctx.story_id,
            provider,
            &hash[..hash.len().min(16)],
            Uuid::new_v4().simple()
        );
        let audio_size = audio.len();
        let audio_url = self
            .storage
            .upload_audio_buffer(audio, &filename)
            .await
            .map_err(|e| TtsServiceError::Dependency(format!("audio upload failed: {}", e)))?;

        let key = ParagraphCacheKey::from_hash(ctx.story_id, hash.to_string(), &ctx.voice.voice_id, provider);
        self.cache.store(&key, &audio_url).await;

        tracing::info!(
            provider = %provider,
            story_id = %ctx.story_id,
            voice_id = %ctx.voice.voice_id,
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.chars().count(),
            audio_size_bytes = audio_size,
            "TTS synthesis completed"
        );

        Ok(SynthesisResult {
            audio_url,
            provider: provider.into(),
        })
    }
}
