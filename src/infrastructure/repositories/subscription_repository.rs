use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

/// A free user's one-time premium trial
#[derive(Debug, Clone, FromRow)]
pub struct PremiumTrial {
    pub user_id: Uuid,
    pub story_id: Uuid,
    pub voice_id: String,
    pub created_at: DateTime<Utc>,
}

/// Subscription and premium-usage records consulted by the quota gate
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn is_premium_user(&self, user_id: Uuid) -> AppResult<bool>;

    /// Distinct premium voices already used for a story
    async fn premium_voices_for_story(&self, story_id: Uuid) -> AppResult<Vec<String>>;

    async fn find_trial(&self, user_id: Uuid) -> AppResult<Option<PremiumTrial>>;

    async fn record_premium_voice(
        &self,
        story_id: Uuid,
        voice_id: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<()>;

    /// Claim the trial for a user; the first claim wins
    async fn record_trial(&self, user_id: Uuid, story_id: Uuid, voice_id: &str) -> AppResult<()>;
}

pub struct PgSubscriptionRepository {
    pool: Arc<DbPool>,
}

impl PgSubscriptionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn is_premium_user(&self, user_id: Uuid) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let is_premium = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE id = $1
                  AND subscription_tier = 'pro'
                  AND subscription_status = 'active'
                  AND (subscription_expires_at IS NULL OR subscription_expires_at > NOW())
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(is_premium)
    }

    async fn premium_voices_for_story(&self, story_id: Uuid) -> AppResult<Vec<String>> {
        let pool = self.pool.as_ref();
        let voices = sqlx::query_scalar::<_, String>(
            r#"
            SELECT voice_id
            FROM story_premium_voices
            WHERE story_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(story_id)
        .fetch_all(pool)
        .await?;

        Ok(voices)
    }

    async fn find_trial(&self, user_id: Uuid) -> AppResult<Option<PremiumTrial>> {
        let pool = self.pool.as_ref();
        let trial = sqlx::query_as::<_, PremiumTrial>(
            r#"
            SELECT user_id, story_id, voice_id, created_at
            FROM premium_trials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(trial)
    }

    async fn record_premium_voice(
        &self,
        story_id: Uuid,
        voice_id: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            INSERT INTO story_premium_voices (story_id, voice_id, user_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (story_id, voice_id) DO NOTHING
            "#,
        )
        .bind(story_id)
        .bind(voice_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn record_trial(&self, user_id: Uuid, story_id: Uuid, voice_id: &str) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            INSERT INTO premium_trials (user_id, story_id, voice_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(story_id)
        .bind(voice_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }
}
