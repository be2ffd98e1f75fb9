/*!
 * End-to-end translation flow tests: cancellation, threshold acceptance,
 * and cache reuse across consecutive requests on one engine.
 */

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use transdeck::errors::EngineError;
use transdeck::providers::mock::MockProvider;
use transdeck::translation::{
    CancellationFlag, ProgressEvent, TranslationEngine, TranslationSource,
};
use transdeck::app_config::EngineConfig;

use crate::common::{engine_with, engine_with_config, numbered_request, test_config};

#[tokio::test]
async fn test_engine_cancellationMidRequest_shouldSkipRemainingSubBatches() {
    let provider = MockProvider::working().with_delay(Duration::from_millis(10));
    let engine = engine_with(provider.clone());

    let cancel = CancellationFlag::new();
    let cancel_from_sink = cancel.clone();
    let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    // Cancel as soon as the first sub-batch settles
    let outcome = engine
        .translate_batch_with_progress(
            numbered_request(6, 1, 1),
            Some(Arc::new(move |event: ProgressEvent| {
                sink.lock().push(event);
                cancel_from_sink.cancel();
            })),
            &cancel,
        )
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.fragments.len(), 6);

    // In-flight work finished; nothing new started after the signal
    let translated = outcome
        .fragments
        .iter()
        .filter(|f| f.source == TranslationSource::Api)
        .count();
    assert!(translated >= 1);
    assert!(provider.calls() < 6);

    // Unattempted fragments fall back with the cancelled flag set
    let cancelled: Vec<&_> = outcome.fragments.iter().filter(|f| f.cancelled).collect();
    assert!(!cancelled.is_empty());
    for fragment in &cancelled {
        assert_eq!(fragment.source, TranslationSource::Fallback);
        assert_eq!(fragment.translated, fragment.original);
    }

    // Progress still terminates at exactly 100
    let events = events.lock();
    assert_eq!(events.last().unwrap().percentage, 100.0);
}

#[tokio::test]
async fn test_engine_cancelledBeforeDispatch_shouldFallBackEverything() {
    let provider = MockProvider::working();
    let engine = engine_with(provider.clone());

    let cancel = CancellationFlag::new();
    cancel.cancel();

    let outcome = engine
        .translate_batch_with_progress(numbered_request(5, 2, 2), None, &cancel)
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(provider.calls(), 0);
    assert_eq!(outcome.fragments.len(), 5);
    assert!(outcome.fragments.iter().all(|f| f.cancelled));
}

#[tokio::test]
async fn test_engine_partialFailureAboveThreshold_shouldBeAccepted() {
    let provider = MockProvider::failing_for(vec!["slide text 08".to_string()]);
    let mut config = test_config();
    config.min_success_rate = 0.5;
    let engine = engine_with_config(provider, config);

    let outcome = engine
        .translate_batch(numbered_request(12, 4, 2))
        .await
        .unwrap();

    // One of three sub-batches failed: 8/12 fragments translated
    assert!((outcome.success_rate - 8.0 / 12.0).abs() < 1e-9);
    assert!(outcome.accepted);
    assert_eq!(outcome.fallback_count, 4);
}

#[tokio::test]
async fn test_engine_consecutiveRequests_shouldReuseCacheAcrossCalls() {
    let provider = MockProvider::working();
    let engine = engine_with(provider.clone());

    // Three presentations sharing boilerplate slides
    for _ in 0..3 {
        let outcome = engine
            .translate_batch(numbered_request(9, 3, 2))
            .await
            .unwrap();
        assert_eq!(outcome.fragments.len(), 9);
        assert_eq!(outcome.fallback_count, 0);
    }

    // First request cost three API calls; the rest hit the cache
    assert_eq!(provider.calls(), 3);
    let stats = engine.cache_stats();
    assert_eq!(stats.hits, 18);
}

#[tokio::test]
async fn test_engine_missingApiKey_shouldFailFastWithConfigError() {
    let config = EngineConfig::default();
    let result = TranslationEngine::new(config);

    match result {
        Err(EngineError::Config(message)) => assert!(message.contains("API key")),
        other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_engine_requestOverrides_shouldBeatConfigDefaults() {
    let provider = MockProvider::working();
    let mut config = test_config();
    config.batch_size = 50;
    let engine = engine_with_config(provider.clone(), config);

    // The request's batch size of 2 wins over the configured 50
    engine
        .translate_batch(numbered_request(6, 2, 2))
        .await
        .unwrap();

    assert_eq!(provider.calls(), 3);
}
