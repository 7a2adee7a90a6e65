use crate::domain::tts::CustomVoice;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait CustomVoiceRepository: Send + Sync {
    /// Find a cloned voice by its id or, failing that, its name
    async fn find_by_id_or_name(&self, reference: &str) -> AppResult<Option<CustomVoice>>;
}

pub struct PgCustomVoiceRepository {
    pool: Arc<DbPool>,
}

impl PgCustomVoiceRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomVoiceRepository for PgCustomVoiceRepository {
    async fn find_by_id_or_name(&self, reference: &str) -> AppResult<Option<CustomVoice>> {
        let pool = self.pool.as_ref();

        if let Ok(id) = Uuid::parse_str(reference) {
            let voice = sqlx::query_as::<_, CustomVoice>(
                "SELECT id, user_id, name, elevenlabs_voice_id, created_at FROM custom_voices WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
            .await?;

            if voice.is_some() {
                return Ok(voice);
            }
        }

        let voice = sqlx::query_as::<_, CustomVoice>(
            r#"
            SELECT id, user_id, name, elevenlabs_voice_id, created_at
            FROM custom_voices
            WHERE LOWER(name) = LOWER($1)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(reference)
        .fetch_optional(pool)
        .await?;

        Ok(voice)
    }
}
