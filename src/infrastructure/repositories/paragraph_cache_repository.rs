use crate::domain::tts::ParagraphCacheKey;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ParagraphCacheEntry {
    pub story_id: Uuid,
    pub text_hash: String,
    pub voice_id: String,
    pub provider: String,
    pub audio_url: String,
    pub updated_at: DateTime<Utc>,
}

/// Persistent store behind the paragraph cache.
/// `(story_id, text_hash, voice_id, provider)` is unique.
#[async_trait]
pub trait ParagraphCacheRepository: Send + Sync {
    async fn find(&self, key: &ParagraphCacheKey) -> AppResult<Option<String>>;

    /// Entries for the text and voice under every provider
    async fn find_for_voice(
        &self,
        story_id: Uuid,
        text_hash: &str,
        voice_id: &str,
    ) -> AppResult<Vec<ParagraphCacheEntry>>;

    /// Insert or replace the URL for the key
    async fn upsert(&self, key: &ParagraphCacheKey, audio_url: &str) -> AppResult<()>;
}

pub struct PgParagraphCacheRepository {
    pool: Arc<DbPool>,
}

impl PgParagraphCacheRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParagraphCacheRepository for PgParagraphCacheRepository {
    async fn find(&self, key: &ParagraphCacheKey) -> AppResult<Option<String>> {
        let pool = self.pool.as_ref();
        let url = sqlx::query_scalar::<_, String>(
            r#"
            SELECT audio_url
            FROM paragraph_audio_cache
            WHERE story_id = $1 AND text_hash = $2 AND voice_id = $3 AND provider = $4
            "#,
        )
        .bind(key.story_id)
        .bind(&key.text_hash)
        .bind(&key.voice_id)
        .bind(key.provider.as_str())
        .fetch_optional(pool)
        .await?;

        Ok(url)
    }

    async fn find_for_voice(
        &self,
        story_id: Uuid,
        text_hash: &str,
        voice_id: &str,
    ) -> AppResult<Vec<ParagraphCacheEntry>> {
        let pool = self.pool.as_ref();
        let entries = sqlx::query_as::<_, ParagraphCacheEntry>(
            r#"
            SELECT story_id, text_hash, voice_id, provider, audio_url, updated_at
            FROM paragraph_audio_cache
            WHERE story_id = $1 AND text_hash = $2 AND voice_id = $3
            "#,
        )
        .bind(story_id)
        .bind(text_hash)
        .bind(voice_id)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }

    async fn upsert(&self, key: &ParagraphCacheKey, audio_url: &str) -> AppResult<()> {
        let pool = self.pool.as_ref();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO paragraph_audio_cache (id, story_id, text_hash, voice_id, provider, audio_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (story_id, text_hash, voice_id, provider)
            DO UPDATE SET
                audio_url = EXCLUDED.audio_url,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key.story_id)
        .bind(&key.text_hash)
        .bind(&key.voice_id)
        .bind(key.provider.as_str())
        .bind(audio_url)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }
}
