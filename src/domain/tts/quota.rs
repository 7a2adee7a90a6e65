use crate::infrastructure::repositories::SubscriptionRepository;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Decides whether the premium provider may be used for a request.
/// Every check degrades to "not allowed" on store errors.
pub struct QuotaGate {
    subscriptions: Arc<dyn SubscriptionRepository>,
    premium_voices_per_story: usize,
}

impl QuotaGate {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, premium_voices_per_story: usize) -> Self {
        Self {
            subscriptions,
            premium_voices_per_story,
        }
    }

    pub async fn is_premium_user(&self, user_id: Option<Uuid>) -> bool {
        let Some(user_id) = user_id else {
            return false;
        };

        self.subscriptions
            .is_premium_user(user_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, user_id = %user_id, "Subscription lookup failed, treating user as free");
                false
            })
    }

    /// A story may use a premium voice it already used, or a new one while
    /// under its distinct-voice allowance.
    pub async fn can_use_voice_for_story(&self, story_id: Uuid, voice_id: &str) -> bool {
        match self.subscriptions.premium_voices_for_story(story_id).await {
            Ok(voices) => {
                voices.iter().any(|v| v == voice_id) || voices.len() < self.premium_voices_per_story
            }
            Err(e) => {
                tracing::warn!(error = %e, story_id = %story_id, "Premium voice lookup failed");
                false
            }
        }
    }

    /// Free users get exactly one story (and one voice) on the premium provider.
    pub async fn can_free_user_use_trial(&self, user_id: Uuid, voice_id: &str, story_id: Uuid) -> bool {
        match self.subscriptions.find_trial(user_id).await {
            Ok(None) => true,
            Ok(Some(trial)) => trial.story_id == story_id && trial.voice_id == voice_id,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "Trial lookup failed");
                false
            }
        }
    }

    pub async fn allows_premium(
        &self,
        user_id: Option<Uuid>,
        story_id: Uuid,
        premium_voice_id: &str,
        is_premium_user: bool,
    ) -> bool {
        let Some(user_id) = user_id else {
            return false;
        };

        let allowed = if is_premium_user {
            self.can_use_voice_for_story(story_id, premium_voice_id).await
        } else {
            self.can_free_user_use_trial(user_id, premium_voice_id, story_id)
                .await
        };

        tracing::debug!(
            user_id = %user_id,
            story_id = %story_id,
            voice_id = %premium_voice_id,
            is_premium_user,
            allowed,
            "Premium provider quota checked"
        );

        allowed
    }

    /// Record a premium vendor call in the background. Failures are logged
    /// and never reach the synthesis caller.
    pub fn track_premium_usage(
        &self,
        user_id: Option<Uuid>,
        story_id: Uuid,
        voice_id: &str,
        is_premium_user: bool,
    ) -> JoinHandle<()> {
        let subscriptions = self.subscriptions.clone();
        let voice_id = voice_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = subscriptions
                .record_premium_voice(story_id, &voice_id, user_id)
                .await
            {
                tracing::error!(
                    error = %e,
                    story_id = %story_id,
                    voice_id = %voice_id,
                    "Failed to record premium voice usage"
                );
            }

            if let (Some(user_id), false) = (user_id, is_premium_user) {
                if let Err(e) = subscriptions.record_trial(user_id, story_id, &voice_id).await {
                    tracing::error!(
                        error = %e,
                        user_id = %user_id,
                        story_id = %story_id,
                        "Failed to record premium trial usage"
                    );
                }
            }
        })
    }
}
