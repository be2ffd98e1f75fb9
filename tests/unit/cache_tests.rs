/*!
 * Engine-level cache behavior tests: idempotence, interleaved hit/miss
 * ordering, and cross-request reuse.
 */

use transdeck::providers::mock::MockProvider;
use transdeck::translation::{Fragment, TranslationRequest, TranslationSource};

use crate::common::{engine_with, mock_translation, numbered_request};

#[tokio::test]
async fn test_cache_sameRequestTwice_shouldIssueApiCallsOnlyOnce() {
    let provider = MockProvider::working();
    let engine = engine_with(provider.clone());

    let first = engine
        .translate_batch(numbered_request(10, 5, 2))
        .await
        .unwrap();
    let calls_after_first = provider.calls();
    assert_eq!(calls_after_first, 2);

    let second = engine
        .translate_batch(numbered_request(10, 5, 2))
        .await
        .unwrap();

    // The second run is served entirely from cache: the API-call counter
    // does not move
    assert_eq!(provider.calls(), calls_after_first);
    assert!(second
        .fragments
        .iter()
        .all(|f| f.source == TranslationSource::Cache));
    // Both runs produce identical text
    for (a, b) in first.fragments.iter().zip(second.fragments.iter()) {
        assert_eq!(a.translated, b.translated);
    }
}

#[tokio::test]
async fn test_cache_interleavedHitsAndMisses_shouldPreserveInputOrder() {
    let provider = MockProvider::working();
    let engine = engine_with(provider.clone());

    // Warm the cache with the fragments that will sit at odd positions
    let warmup = TranslationRequest::new(
        vec![
            Fragment::new("warm-b", "text bravo"),
            Fragment::new("warm-d", "text delta"),
        ],
        "ja",
    );
    engine.translate_batch(warmup).await.unwrap();

    let request = TranslationRequest::new(
        vec![
            Fragment::new("a", "text alpha"),
            Fragment::new("b", "text bravo"),
            Fragment::new("c", "text charlie"),
            Fragment::new("d", "text delta"),
            Fragment::new("e", "text echo"),
        ],
        "ja",
    )
    .batch_size(2);

    let outcome = engine.translate_batch(request).await.unwrap();

    let ids: Vec<&str> = outcome.fragments.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);

    let sources: Vec<TranslationSource> =
        outcome.fragments.iter().map(|f| f.source).collect();
    assert_eq!(
        sources,
        vec![
            TranslationSource::Api,
            TranslationSource::Cache,
            TranslationSource::Api,
            TranslationSource::Cache,
            TranslationSource::Api,
        ]
    );

    // Cache hits carry the same translation the API produced earlier
    for fragment in &outcome.fragments {
        assert_eq!(fragment.translated, mock_translation(&fragment.original));
    }
}

#[tokio::test]
async fn test_cache_differentTargetLanguage_shouldMiss() {
    let provider = MockProvider::working();
    let engine = engine_with(provider.clone());

    engine
        .translate_batch(TranslationRequest::new(
            vec![Fragment::new("a", "hello")],
            "ja",
        ))
        .await
        .unwrap();
    let outcome = engine
        .translate_batch(TranslationRequest::new(
            vec![Fragment::new("a", "hello")],
            "fr",
        ))
        .await
        .unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(outcome.fragments[0].source, TranslationSource::Api);
}

#[tokio::test]
async fn test_cache_successfulSubBatch_shouldBeCachedEvenWhenSiblingFails() {
    // Sub-batch #2 fails; sub-batches #1 and #3 succeed and must be
    // cached despite the sibling failure
    let failing = MockProvider::failing_for(vec!["slide text 05".to_string()]);
    let engine = engine_with(failing.clone());

    engine
        .translate_batch(numbered_request(12, 5, 3))
        .await
        .unwrap();
    let calls_after_first = failing.calls();

    let outcome = engine
        .translate_batch(numbered_request(12, 5, 3))
        .await
        .unwrap();

    // Only the previously failed fragments go back to the API; they form
    // a single retry-eligible sub-batch that fails again
    let cached = outcome
        .fragments
        .iter()
        .filter(|f| f.source == TranslationSource::Cache)
        .count();
    assert_eq!(cached, 7);
    assert!(failing.calls() > calls_after_first);
}

#[tokio::test]
async fn test_cache_disabled_shouldAlwaysCallApi() {
    let provider = MockProvider::working();
    let mut config = crate::common::test_config();
    config.cache.enabled = false;
    let engine = crate::common::engine_with_config(provider.clone(), config);

    engine
        .translate_batch(numbered_request(4, 4, 1))
        .await
        .unwrap();
    engine
        .translate_batch(numbered_request(4, 4, 1))
        .await
        .unwrap();

    assert_eq!(provider.calls(), 2);
}
