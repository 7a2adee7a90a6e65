use super::provider::TtsProvider;
use crate::infrastructure::repositories::ParagraphCacheRepository;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Composite key of a cached paragraph. Texts that normalize identically
/// share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParagraphCacheKey {
    pub story_id: Uuid,
    pub text_hash: String,
    pub voice_id: String,
    pub provider: TtsProvider,
}

impl ParagraphCacheKey {
    pub fn from_hash(
        story_id: Uuid,
        text_hash: String,
        voice_id: &str,
        provider: TtsProvider,
    ) -> Self {
        Self {
            story_id,
            text_hash,
            voice_id: voice_id.to_string(),
            provider,
        }
    }
}

/// Content-addressed paragraph audio cache. Backed by the persistent store,
/// optionally fronted by an in-process cache. Lookup errors count as misses
/// and store errors are logged and swallowed.
pub struct ParagraphCache {
    store: Arc<dyn ParagraphCacheRepository>,
    memory: Option<Cache<ParagraphCacheKey, String>>,
}

impl ParagraphCache {
    pub fn new(store: Arc<dyn ParagraphCacheRepository>, memory_enabled: bool) -> Self {
        let memory = if memory_enabled {
            Some(
                Cache::builder()
                    .max_capacity(10_000)
                    .time_to_idle(Duration::from_secs(30 * 60))
                    .build(),
            )
        } else {
            None
        };

        Self { store, memory }
    }

    pub async fn lookup(&self, key: &ParagraphCacheKey) -> Option<String> {
        if let Some(memory) = &self.memory {
            if let Some(url) = memory.get(key).await {
                return Some(url);
            }
        }

        match self.store.find(key).await {
            Ok(Some(url)) => {
                self.remember(key.clone(), url.clone()).await;
                Some(url)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    story_id = %key.story_id,
                    provider = %key.provider,
                    "Paragraph cache lookup failed, treating as miss"
                );
                None
            }
        }
    }

    /// Cached audio for the text under any provider, best provider first.
    /// A provider held in memory is answered without consulting the store.
    pub async fn lookup_any(
        &self,
        story_id: Uuid,
        text_hash: &str,
        voice_id: &str,
    ) -> Option<(TtsProvider, String)> {
        if let Some(memory) = &self.memory {
            for provider in TtsProvider::CHAIN {
                let key = ParagraphCacheKey::from_hash(story_id, text_hash.to_string(), voice_id, provider);
                if let Some(url) = memory.get(&key).await {
                    return Some((provider, url));
                }
            }
        }

        let entries = match self.store.find_for_voice(story_id, text_hash, voice_id).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    story_id = %story_id,
                    "Paragraph cache lookup failed, treating as miss"
                );
                return None;
            }
        };

        let best = entries
            .into_iter()
            .filter_map(|entry| {
                entry
                    .provider
                    .parse::<TtsProvider>()
                    .ok()
                    .map(|provider| (provider, entry.audio_url))
            })
            .min_by_key(|(provider, _)| {
                TtsProvider::CHAIN
                    .iter()
                    .position(|p| p == provider)
                    .unwrap_or(usize::MAX)
            })?;

        let key = ParagraphCacheKey::from_hash(story_id, text_hash.to_string(), voice_id, best.0);
        self.remember(key, best.1.clone()).await;
        Some(best)
    }

    /// Upsert the audio URL for a key. Never fails the caller.
    pub async fn store(&self, key: &ParagraphCacheKey, audio_url: &str) {
        if let Err(e) = self.store.upsert(key, audio_url).await {
            tracing::error!(
                error = %e,
                story_id = %key.story_id,
                provider = %key.provider,
                text_hash = %key.text_hash,
                "Failed to store paragraph audio in cache"
            );
            return;
        }

        self.remember(key.clone(), audio_url.to_string()).await;
    }

    async fn remember(&self, key: ParagraphCacheKey, audio_url: String) {
        if let Some(memory) = &self.memory {
            memory.insert(key, audio_url).await;
        }
    }
}
