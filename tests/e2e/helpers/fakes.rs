use async_trait::async_trait;
use chrono::Utc;
use narration_backend::domain::tts::{CustomVoice, ParagraphCacheKey, VoiceSettings};
use narration_backend::error::{AppError, AppResult};
use narration_backend::infrastructure::repositories::{
    AudioStorage, CustomVoiceRepository, ParagraphCacheEntry, ParagraphCacheRepository,
    PremiumTrial, SubscriptionRepository, TtsRepository,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// A vendor call as seen by the fake adapter
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct VendorCall {
    pub text: String,
    pub voice: String,
    pub model: Option<String>,
    pub has_settings: bool,
}

/// Speech vendor returning fake MP3 bytes, with a failure switch
#[derive(Default)]
pub struct FakeTtsRepository {
    calls: Mutex<Vec<VendorCall>>,
    started: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fail: AtomicBool,
    delay_ms: AtomicU64,
    /// First call sleeps this long, each later call 10ms less
    descending_delay_ms: AtomicU64,
}

/// Counts a call as in flight until dropped, even when the caller gives up
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[allow(dead_code)]
impl FakeTtsRepository {
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<VendorCall> {
        self.calls.lock().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_descending_delays(&self, first_ms: u64) {
        self.descending_delay_ms.store(first_ms, Ordering::SeqCst);
    }

    /// Every call sleeps this long before answering
    pub fn set_delay(&self, ms: u64) {
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Most calls that were ever running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsRepository for FakeTtsRepository {
    async fn generate_audio(
        &self,
        text: &str,
        voice: &str,
        model: Option<&str>,
        settings: Option<&VoiceSettings>,
    ) -> Result<Vec<u8>, String> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let order = self.started.fetch_add(1, Ordering::SeqCst) as u64;
        let delay = self.delay_ms.load(Ordering::SeqCst)
            + self
                .descending_delay_ms
                .load(Ordering::SeqCst)
                .saturating_sub(order * 10);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.calls.lock().push(VendorCall {
            text: text.to_string(),
            voice: voice.to_string(),
            model: model.map(str::to_string),
            has_settings: settings.is_some(),
        });

        if self.fail.load(Ordering::SeqCst) {
            return Err("vendor returned 500".to_string());
        }

        Ok(format!("ID3 {} :: {}", voice, text).into_bytes())
    }
}

type CacheTuple = (Uuid, String, String, String);

#[derive(Default)]
pub struct MemoryParagraphCache {
    entries: Mutex<HashMap<CacheTuple, String>>,
    fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl MemoryParagraphCache {
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn seed(&self, key: &ParagraphCacheKey, audio_url: &str) {
        self.entries.lock().insert(tuple(key), audio_url.to_string());
    }

    pub fn set_failing_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

fn tuple(key: &ParagraphCacheKey) -> CacheTuple {
    (
        key.story_id,
        key.text_hash.clone(),
        key.voice_id.clone(),
        key.provider.to_string(),
    )
}

#[async_trait]
impl ParagraphCacheRepository for MemoryParagraphCache {
    async fn find(&self, key: &ParagraphCacheKey) -> AppResult<Option<String>> {
        Ok(self.entries.lock().get(&tuple(key)).cloned())
    }

    async fn find_for_voice(
        &self,
        story_id: Uuid,
        text_hash: &str,
        voice_id: &str,
    ) -> AppResult<Vec<ParagraphCacheEntry>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|((story, hash, voice, _), _)| {
                *story == story_id && hash == text_hash && voice == voice_id
            })
            .map(|((story, hash, voice, provider), url)| ParagraphCacheEntry {
                story_id: *story,
                text_hash: hash.clone(),
                voice_id: voice.clone(),
                provider: provider.clone(),
                audio_url: url.clone(),
                updated_at: Utc::now(),
            })
            .collect())
    }

    async fn upsert(&self, key: &ParagraphCacheKey, audio_url: &str) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("cache table locked".to_string()));
        }
        self.seed(key, audio_url);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySubscriptions {
    premium_users: Mutex<HashSet<Uuid>>,
    story_voices: Mutex<HashMap<Uuid, Vec<String>>>,
    trials: Mutex<HashMap<Uuid, PremiumTrial>>,
}

#[allow(dead_code)]
impl MemorySubscriptions {
    pub fn add_premium_user(&self, user_id: Uuid) {
        self.premium_users.lock().insert(user_id);
    }

    pub fn trial(&self, user_id: Uuid) -> Option<PremiumTrial> {
        self.trials.lock().get(&user_id).cloned()
    }

    pub fn story_voices(&self, story_id: Uuid) -> Vec<String> {
        self.story_voices
            .lock()
            .get(&story_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptions {
    async fn is_premium_user(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.premium_users.lock().contains(&user_id))
    }

    async fn premium_voices_for_story(&self, story_id: Uuid) -> AppResult<Vec<String>> {
        Ok(self.story_voices(story_id))
    }

    async fn find_trial(&self, user_id: Uuid) -> AppResult<Option<PremiumTrial>> {
        Ok(self.trial(user_id))
    }

    async fn record_premium_voice(
        &self,
        story_id: Uuid,
        voice_id: &str,
        _user_id: Option<Uuid>,
    ) -> AppResult<()> {
        let mut voices = self.story_voices.lock();
        let entry = voices.entry(story_id).or_default();
        if !entry.iter().any(|v| v == voice_id) {
            entry.push(voice_id.to_string());
        }
        Ok(())
    }

    async fn record_trial(&self, user_id: Uuid, story_id: Uuid, voice_id: &str) -> AppResult<()> {
        self.trials.lock().entry(user_id).or_insert(PremiumTrial {
            user_id,
            story_id,
            voice_id: voice_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCustomVoices {
    voices: Mutex<Vec<CustomVoice>>,
}

#[allow(dead_code)]
impl MemoryCustomVoices {
    pub fn add(&self, name: &str, elevenlabs_voice_id: &str) -> CustomVoice {
        let voice = CustomVoice {
            id: Uuid::new_v4(),
            user_id: None,
            name: name.to_string(),
            elevenlabs_voice_id: Some(elevenlabs_voice_id.to_string()),
            created_at: Utc::now(),
        };
        self.voices.lock().push(voice.clone());
        voice
    }
}

#[async_trait]
impl CustomVoiceRepository for MemoryCustomVoices {
    async fn find_by_id_or_name(&self, reference: &str) -> AppResult<Option<CustomVoice>> {
        Ok(self
            .voices
            .lock()
            .iter()
            .find(|voice| {
                voice.id.to_string() == reference || voice.name.eq_ignore_ascii_case(reference)
            })
            .cloned())
    }
}

/// Storage that keeps uploads in memory and hands out CDN-style URLs
#[derive(Default)]
pub struct MemoryAudioStorage {
    uploads: Mutex<HashMap<String, Vec<u8>>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl MemoryAudioStorage {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().len()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioStorage for MemoryAudioStorage {
    async fn upload_audio_buffer(&self, audio: Vec<u8>, filename: &str) -> Result<String, String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("bucket unavailable".to_string());
        }
        self.uploads.lock().insert(filename.to_string(), audio);
        Ok(format!("https://cdn.test/{}", filename))
    }
}
