use super::breaker::CircuitState;
use super::cache::ParagraphCacheKey;
use super::provider::TtsProvider;
use super::service::{SynthesisContext, TtsService};
use super::text::{split_into_paragraphs, text_hash};
use super::voice::DEFAULT_VOICE_ID;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub index: usize,
    pub text: String,
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// One entry per paragraph, ordered by index
    pub results: Vec<BatchItem>,
    /// Paragraph count before truncation
    pub total_paragraphs: usize,
    pub was_truncated: bool,
    pub used_provider: TtsProvider,
    /// Provider chosen by quota, when a different one ended up being used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<TtsProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<ProviderStatus>,
}

/// Distinct paragraph text and every position it occurs at
#[derive(Debug)]
struct UniqueParagraph {
    text_hash: String,
    text: String,
    indices: Vec<usize>,
}

fn dedupe_paragraphs(paragraphs: &[String]) -> Vec<UniqueParagraph> {
    let mut unique: Vec<UniqueParagraph> = Vec::new();
    let mut by_hash: HashMap<String, usize> = HashMap::new();

    for (index, text) in paragraphs.iter().enumerate() {
        let hash = text_hash(text);
        match by_hash.get(&hash) {
            Some(&position) => unique[position].indices.push(index),
            None => {
                by_hash.insert(hash.clone(), unique.len());
                unique.push(UniqueParagraph {
                    text_hash: hash,
                    text: text.clone(),
                    indices: vec![index],
                });
            }
        }
    }

    unique
}

impl TtsService {
    pub(super) async fn narrate_story(
        &self,
        story_id: Uuid,
        full_text: &str,
        voice_id: Option<&str>,
        user_id: Option<Uuid>,
    ) -> BatchOutcome {
        let mut paragraphs = split_into_paragraphs(full_text, self.settings.paragraph_target_words);
        let total_paragraphs = paragraphs.len();
        let was_truncated = total_paragraphs > self.settings.max_paragraphs;
        paragraphs.truncate(self.settings.max_paragraphs);

        let unique = dedupe_paragraphs(&paragraphs);

        tracing::info!(
            story_id = %story_id,
            user_id = ?user_id,
            total_paragraphs,
            unique_paragraphs = unique.len(),
            was_truncated,
            "Story narration request"
        );

        let ctx = self
            .prepare(story_id, voice_id.unwrap_or(DEFAULT_VOICE_ID), user_id)
            .await;

        // One provider for the whole story, picked before any cache lookup
        let preferred = if ctx.premium_allowed {
            TtsProvider::ElevenLabs
        } else {
            TtsProvider::OpenAi
        };
        let mut provider = self.choose_batch_provider(preferred);

        let urls = loop {
            let (urls, complete) = self.narrate_with_provider(&ctx, &unique, provider).await;
            if complete {
                break urls;
            }

            match provider.next() {
                Some(next) => {
                    tracing::warn!(
                        story_id = %story_id,
                        from = %provider,
                        to = %next,
                        "Story narration failed on provider, failing over whole batch"
                    );
                    provider = next;
                }
                None => {
                    tracing::error!(
                        story_id = %story_id,
                        missing = urls.iter().filter(|url| url.is_none()).count(),
                        "Story narration exhausted every provider"
                    );
                    break urls;
                }
            }
        };

        let mut audio_by_index: Vec<Option<String>> = vec![None; paragraphs.len()];
        for (paragraph, url) in unique.iter().zip(urls) {
            for &index in &paragraph.indices {
                audio_by_index[index] = url.clone();
            }
        }

        let mut results: Vec<BatchItem> = paragraphs
            .into_iter()
            .zip(audio_by_index)
            .enumerate()
            .map(|(index, (text, audio_url))| BatchItem {
                index,
                text,
                audio_url,
            })
            .collect();
        results.sort_by_key(|item| item.index);

        let provider_status = self.breakers.any_open().then_some(ProviderStatus::Degraded);

        tracing::info!(
            story_id = %story_id,
            used_provider = %provider,
            generated = results.iter().filter(|item| item.audio_url.is_some()).count(),
            paragraphs = results.len(),
            degraded = provider_status.is_some(),
            "Story narration completed"
        );

        BatchOutcome {
            results,
            total_paragraphs,
            was_truncated,
            used_provider: provider,
            preferred_provider: (provider != preferred).then_some(preferred),
            provider_status,
        }
    }

    /// First provider from `preferred` down whose breaker is not open.
    /// Falls back to `preferred` itself when every breaker is open.
    fn choose_batch_provider(&self, preferred: TtsProvider) -> TtsProvider {
        preferred
            .downgrade_chain()
            .find(|provider| !self.breakers.for_provider(*provider).is_open())
            .unwrap_or(preferred)
    }

    /// Source every unique paragraph from one provider: cache first, then
    /// generation in bounded chunks. Returns the URLs and whether all succeeded.
    async fn narrate_with_provider(
        &self,
        ctx: &SynthesisContext,
        unique: &[UniqueParagraph],
        provider: TtsProvider,
    ) -> (Vec<Option<String>>, bool) {
        let lookups = unique.iter().map(|paragraph| {
            let key = ParagraphCacheKey::from_hash(
                ctx.story_id,
                paragraph.text_hash.clone(),
                &ctx.voice.voice_id,
                provider,
            );
            async move { self.cache.lookup(&key).await }
        });
        let mut urls: Vec<Option<String>> = join_all(lookups).await;

        let pending: Vec<usize> = (0..unique.len()).filter(|&i| urls[i].is_none()).collect();

        tracing::info!(
            story_id = %ctx.story_id,
            provider = %provider,
            cached = unique.len() - pending.len(),
            pending = pending.len(),
            "Generating story paragraphs"
        );

        // The last provider in the chain keeps going to salvage what it can
        let stop_on_failure = provider.next().is_some();
        let chunk_size = self.settings.max_concurrent_generations.max(1);
        let mut complete = true;

        // A recovering breaker admits a single trial call: settle it alone
        // before fanning out the rest
        let recovering =
            self.breakers.for_provider(provider).snapshot().state != CircuitState::Closed;
        let (trial, rest) = pending.split_at(if recovering { pending.len().min(1) } else { 0 });
        let chunks = std::iter::once(trial)
            .filter(|chunk| !chunk.is_empty())
            .chain(rest.chunks(chunk_size));

        for chunk in chunks {
            let attempts = chunk.iter().map(|&i| async move {
                let paragraph = &unique[i];
                let result = self
                    .synthesize_with_provider(ctx, &paragraph.text, &paragraph.text_hash, provider)
                    .await;
                (i, result)
            });

            for (i, result) in join_all(attempts).await {
                match result {
                    Ok(synthesized) => urls[i] = Some(synthesized.audio_url),
                    Err(e) => {
                        complete = false;
                        tracing::warn!(
                            error = %e,
                            provider = %provider,
                            paragraph_indices = ?unique[i].indices,
                            "Paragraph generation failed"
                        );
                    }
                }
            }

            if !complete && stop_on_failure {
                break;
            }
        }

        (urls, complete)
    }
}
