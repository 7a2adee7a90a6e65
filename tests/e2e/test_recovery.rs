use crate::e2e::helpers;

use helpers::TestContext;
use narration_backend::domain::tts::{
    AudioSource, BreakerConfig, CircuitBreakerRegistry, CircuitState, SynthesisOptions,
    TtsProvider, TtsServiceApi,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use test_context::test_context;

const COOLDOWN: Duration = Duration::from_millis(50);

/// Breakers that open on the first failure and recover quickly
fn quick_breakers() -> Arc<CircuitBreakerRegistry> {
    Arc::new(CircuitBreakerRegistry::new(BreakerConfig {
        failure_threshold: 1,
        cooldown: COOLDOWN,
    }))
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reopen_breaker_when_trial_request_is_abandoned(ctx: &TestContext) {
    let breakers = quick_breakers();
    let service = ctx.service_with_breakers(breakers.clone());
    let openai = breakers.for_provider(TtsProvider::OpenAi);
    openai.record_failure("vendor returned 500");
    tokio::time::sleep(COOLDOWN + Duration::from_millis(10)).await;

    ctx.openai.set_delay(200);
    let options = SynthesisOptions {
        provider_override: Some(TtsProvider::OpenAi),
    };
    let attempt = service.synthesize(ctx.story_id, "Once upon a time.", None, None, options);
    // Caller gives up while the trial call is still waiting on the vendor
    assert!(tokio::time::timeout(Duration::from_millis(20), attempt)
        .await
        .is_err());

    assert_eq!(openai.snapshot().state, CircuitState::Open);
    assert!(breakers.any_open());

    tokio::time::sleep(COOLDOWN + Duration::from_millis(10)).await;
    ctx.openai.set_delay(0);
    let result = service
        .synthesize(ctx.story_id, "Once upon a time.", None, None, options)
        .await
        .expect("breaker admits a new trial after the cooldown");

    assert_eq!(result.provider, AudioSource::OpenAi);
    assert_eq!(openai.snapshot().state, CircuitState::Closed);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_recovered_premium_provider_for_whole_story(ctx: &TestContext) {
    let breakers = quick_breakers();
    let service = ctx.service_with_breakers(breakers.clone());
    let (user_id, _) = ctx.premium_user();
    let elevenlabs = breakers.for_provider(TtsProvider::ElevenLabs);
    elevenlabs.record_failure("vendor returned 500");
    tokio::time::sleep(COOLDOWN + Duration::from_millis(10)).await;
    ctx.elevenlabs.set_delay(50);

    let outcome = service
        .synthesize_story(
            ctx.story_id,
            "The first page.\n\nThe second page.\n\nThe third page.",
            None,
            Some(user_id),
        )
        .await;

    assert_eq!(outcome.used_provider, TtsProvider::ElevenLabs);
    assert_eq!(outcome.preferred_provider, None);
    assert_eq!(outcome.provider_status, None);
    assert_eq!(ctx.elevenlabs.call_count(), 3);
    assert_eq!(ctx.openai.call_count(), 0);
    assert_eq!(elevenlabs.snapshot().state, CircuitState::Closed);
    assert!(outcome
        .results
        .iter()
        .all(|item| item.audio_url.as_deref().is_some_and(|url| url.contains("/elevenlabs_"))));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_over_story_when_trial_call_fails(ctx: &TestContext) {
    let breakers = quick_breakers();
    let service = ctx.service_with_breakers(breakers.clone());
    let (user_id, _) = ctx.premium_user();
    breakers
        .for_provider(TtsProvider::ElevenLabs)
        .record_failure("vendor returned 500");
    tokio::time::sleep(COOLDOWN + Duration::from_millis(10)).await;
    ctx.elevenlabs.set_failing(true);

    let outcome = service
        .synthesize_story(ctx.story_id, "One.\n\nTwo.\n\nThree.", None, Some(user_id))
        .await;

    assert_eq!(outcome.used_provider, TtsProvider::OpenAi);
    assert_eq!(outcome.preferred_provider, Some(TtsProvider::ElevenLabs));
    // Only the trial call reached the recovering vendor
    assert_eq!(ctx.elevenlabs.call_count(), 1);
    assert_eq!(ctx.openai.call_count(), 3);
}
