/*!
 * Tests for orchestrator behavior: completeness, ordering, partial
 * failure, validation, and retry handling.
 */

use std::collections::HashSet;

use transdeck::errors::EngineError;
use transdeck::providers::mock::MockProvider;
use transdeck::translation::{Fragment, TranslationRequest, TranslationSource};

use crate::common::{engine_with, mock_translation, numbered_fragments, numbered_request};

#[tokio::test]
async fn test_translateBatch_twelveFragments_shouldSplitIntoThreeSubBatches() {
    let provider = MockProvider::working();
    let engine = engine_with(provider.clone());

    let outcome = engine
        .translate_batch(numbered_request(12, 5, 3))
        .await
        .unwrap();

    // 12 fragments at batch size 5 dispatch as 5 + 5 + 2
    assert_eq!(provider.calls(), 3);
    assert_eq!(outcome.fragments.len(), 12);
    assert!(outcome
        .fragments
        .iter()
        .all(|f| f.source == TranslationSource::Api));
    assert_eq!(outcome.success_rate, 1.0);
    assert!(outcome.accepted);
    assert_eq!(outcome.fallback_count, 0);
    assert!(!outcome.cancelled);
}

#[tokio::test]
async fn test_translateBatch_shouldPreserveIdSetAndCount() {
    let engine = engine_with(MockProvider::working());
    let fragments = numbered_fragments(23);
    let input_ids: HashSet<String> = fragments.iter().map(|f| f.id.clone()).collect();

    let outcome = engine
        .translate_batch(TranslationRequest::new(fragments, "ja").batch_size(4))
        .await
        .unwrap();

    let output_ids: HashSet<String> = outcome.fragments.iter().map(|f| f.id.clone()).collect();
    assert_eq!(outcome.fragments.len(), 23);
    assert_eq!(input_ids, output_ids);
}

#[tokio::test]
async fn test_translateBatch_shouldPreserveInputOrder() {
    let engine = engine_with(MockProvider::working());
    let fragments = numbered_fragments(17);
    let expected_ids: Vec<String> = fragments.iter().map(|f| f.id.clone()).collect();

    let outcome = engine
        .translate_batch(
            TranslationRequest::new(fragments, "ja")
                .batch_size(3)
                .concurrency(4),
        )
        .await
        .unwrap();

    let output_ids: Vec<String> = outcome.fragments.iter().map(|f| f.id.clone()).collect();
    assert_eq!(output_ids, expected_ids);
}

#[tokio::test]
async fn test_translateBatch_secondSubBatchAlwaysFails_shouldFallBackExactlyThere() {
    // Sub-batch #2 covers fragments 5..10; failing on its first fragment's
    // text fails that sub-batch on the initial call and on every retry
    let provider = MockProvider::failing_for(vec!["slide text 05".to_string()]);
    let engine = engine_with(provider.clone());

    let outcome = engine
        .translate_batch(numbered_request(12, 5, 3))
        .await
        .unwrap();

    let api_count = outcome
        .fragments
        .iter()
        .filter(|f| f.source == TranslationSource::Api)
        .count();
    let fallbacks: Vec<&str> = outcome
        .fragments
        .iter()
        .filter(|f| f.source == TranslationSource::Fallback)
        .map(|f| f.id.as_str())
        .collect();

    assert_eq!(api_count, 7);
    assert_eq!(
        fallbacks,
        vec!["frag-05", "frag-06", "frag-07", "frag-08", "frag-09"]
    );
    // Fallback fragments reuse their original text
    for fragment in &outcome.fragments {
        if fragment.source == TranslationSource::Fallback {
            assert_eq!(fragment.translated, fragment.original);
        } else {
            assert_eq!(fragment.translated, mock_translation(&fragment.original));
        }
    }
    assert!((outcome.success_rate - 7.0 / 12.0).abs() < 1e-9);
    assert!(!outcome.accepted);
    assert_eq!(outcome.fallback_count, 5);
}

#[tokio::test]
async fn test_translateBatch_everyThirdSubBatchFails_shouldMatchFailedSets() {
    // 30 fragments at batch size 5 form 6 sub-batches; fail #1 and #4
    let provider = MockProvider::failing_for(vec![
        "slide text 00".to_string(),
        "slide text 15".to_string(),
    ]);
    let engine = engine_with(provider);

    let outcome = engine
        .translate_batch(numbered_request(30, 5, 3))
        .await
        .unwrap();

    let fallback_ids: HashSet<String> = outcome
        .fragments
        .iter()
        .filter(|f| f.source == TranslationSource::Fallback)
        .map(|f| f.id.clone())
        .collect();
    let expected: HashSet<String> = (0..5)
        .chain(15..20)
        .map(|i| format!("frag-{:02}", i))
        .collect();

    assert_eq!(fallback_ids, expected);
    assert!((outcome.success_rate - 20.0 / 30.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_translateBatch_allSubBatchesFail_shouldStillReturnEveryFragment() {
    let engine = engine_with(MockProvider::failing());

    let outcome = engine
        .translate_batch(numbered_request(8, 3, 2))
        .await
        .unwrap();

    assert_eq!(outcome.fragments.len(), 8);
    assert_eq!(outcome.fallback_count, 8);
    assert_eq!(outcome.success_rate, 0.0);
    assert!(!outcome.accepted);
    for fragment in &outcome.fragments {
        assert_eq!(fragment.translated, fragment.original);
    }
}

#[tokio::test]
async fn test_translateBatch_flakyProvider_shouldSucceedThroughRetries() {
    // Two transient failures, then recovery; retry policy allows 3 attempts
    let provider = MockProvider::flaky(2);
    let engine = engine_with(provider.clone());

    let outcome = engine
        .translate_batch(numbered_request(4, 10, 1))
        .await
        .unwrap();

    assert_eq!(provider.calls(), 3);
    assert!(outcome
        .fragments
        .iter()
        .all(|f| f.source == TranslationSource::Api));
    assert_eq!(outcome.success_rate, 1.0);
}

#[tokio::test]
async fn test_translateBatch_permanentClientError_shouldNotRetry() {
    let provider = MockProvider::failing_with_status(400);
    let engine = engine_with(provider.clone());

    let outcome = engine
        .translate_batch(numbered_request(3, 10, 1))
        .await
        .unwrap();

    // One sub-batch, one attempt: a 400 short-circuits the retry loop
    assert_eq!(provider.calls(), 1);
    assert_eq!(outcome.fallback_count, 3);
}

#[tokio::test]
async fn test_translateBatch_markerlessResponse_shouldFailSubBatchAfterRetries() {
    let provider = MockProvider::missing_markers();
    let engine = engine_with(provider.clone());

    let outcome = engine
        .translate_batch(numbered_request(2, 10, 1))
        .await
        .unwrap();

    // An HTTP 200 without markers is a sub-batch failure, retried like a
    // transient error
    assert_eq!(provider.calls(), 3);
    assert_eq!(outcome.fallback_count, 2);
}

#[tokio::test]
async fn test_translateBatch_duplicateIds_shouldRaiseInvalidRequest() {
    let engine = engine_with(MockProvider::working());
    let request = TranslationRequest::new(
        vec![
            Fragment::new("same-id", "first"),
            Fragment::new("same-id", "second"),
        ],
        "ja",
    );

    let result = engine.translate_batch(request).await;
    assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_translateBatch_emptyFragmentText_shouldFallBackWithoutDispatch() {
    let provider = MockProvider::working();
    let engine = engine_with(provider.clone());
    let request = TranslationRequest::new(
        vec![
            Fragment::new("empty", "   \n"),
            Fragment::new("real", "actual content"),
        ],
        "ja",
    );

    let outcome = engine.translate_batch(request).await.unwrap();

    assert_eq!(outcome.fragments[0].source, TranslationSource::Fallback);
    assert_eq!(outcome.fragments[1].source, TranslationSource::Api);
    // Only the valid fragment was dispatched
    assert_eq!(provider.calls(), 1);
    // Rejected fragments are excluded from the success rate
    assert_eq!(outcome.success_rate, 1.0);
    assert!(outcome.accepted);
}

#[tokio::test]
async fn test_translateBatch_oversizedFragment_shouldFallBackWithoutDispatch() {
    let provider = MockProvider::working();
    let mut config = crate::common::test_config();
    config.max_chars_per_fragment = 50;
    let engine = crate::common::engine_with_config(provider.clone(), config);

    let request = TranslationRequest::new(
        vec![
            Fragment::new("huge", "x".repeat(51)),
            Fragment::new("ok", "short enough"),
        ],
        "ja",
    );

    let outcome = engine.translate_batch(request).await.unwrap();

    assert_eq!(outcome.fragments[0].source, TranslationSource::Fallback);
    assert_eq!(outcome.fragments[1].source, TranslationSource::Api);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_translateBatch_emptyRequest_shouldCompleteImmediately() {
    let provider = MockProvider::working();
    let engine = engine_with(provider.clone());

    let outcome = engine
        .translate_batch(TranslationRequest::new(Vec::new(), "ja"))
        .await
        .unwrap();

    assert!(outcome.fragments.is_empty());
    assert_eq!(outcome.success_rate, 1.0);
    assert!(outcome.accepted);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_translateBatch_duplicateTexts_shouldDispatchOnce() {
    let provider = MockProvider::working();
    let engine = engine_with(provider.clone());
    let request = TranslationRequest::new(
        vec![
            Fragment::new("header-1", "Company Confidential"),
            Fragment::new("body", "Some unique body text"),
            Fragment::new("header-2", "Company Confidential"),
            Fragment::new("header-3", "Company Confidential\n"),
        ],
        "ja",
    );

    let outcome = engine.translate_batch(request).await.unwrap();

    // One sub-batch with two unique texts; repeats resolve from the same
    // API result (whitespace-normalized texts dedup together)
    assert_eq!(provider.calls(), 1);
    assert_eq!(outcome.fragments.len(), 4);
    assert!(outcome
        .fragments
        .iter()
        .all(|f| f.source == TranslationSource::Api));
    assert_eq!(
        outcome.fragments[0].translated,
        outcome.fragments[2].translated
    );
}

#[tokio::test]
async fn test_translateBatch_waveLimit_shouldStillCoverAllFragments() {
    let provider = MockProvider::working();
    let mut config = crate::common::test_config();
    config.max_wave_size = Some(2);
    let engine = crate::common::engine_with_config(provider.clone(), config);

    let outcome = engine
        .translate_batch(numbered_request(20, 4, 2))
        .await
        .unwrap();

    // 5 sub-batches run in waves of 2, all complete
    assert_eq!(provider.calls(), 5);
    assert_eq!(outcome.fragments.len(), 20);
    assert_eq!(outcome.fallback_count, 0);
}
