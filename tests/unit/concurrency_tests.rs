/*!
 * Concurrency bound tests: the number of simultaneously in-flight
 * provider calls never exceeds the configured concurrency.
 */

use std::time::Duration;

use transdeck::providers::mock::MockProvider;

use crate::common::{engine_with, numbered_request};

#[tokio::test]
async fn test_translateBatch_shouldNeverExceedConfiguredConcurrency() {
    // 50 fragments / batch size 5 / concurrency 3: ten sub-batches compete
    // for three slots; the delay forces real overlap
    let provider = MockProvider::working().with_delay(Duration::from_millis(20));
    let engine = engine_with(provider.clone());

    let outcome = engine
        .translate_batch(numbered_request(50, 5, 3))
        .await
        .unwrap();

    assert_eq!(outcome.fragments.len(), 50);
    assert_eq!(provider.calls(), 10);
    assert!(
        provider.max_in_flight() <= 3,
        "observed {} concurrent calls, configured bound is 3",
        provider.max_in_flight()
    );
}

#[tokio::test]
async fn test_translateBatch_withConcurrencyOne_shouldSerializeCalls() {
    let provider = MockProvider::working().with_delay(Duration::from_millis(5));
    let engine = engine_with(provider.clone());

    engine
        .translate_batch(numbered_request(12, 3, 1))
        .await
        .unwrap();

    assert_eq!(provider.calls(), 4);
    assert_eq!(provider.max_in_flight(), 1);
}

#[tokio::test]
async fn test_translateBatch_failuresUnderLoad_shouldNotBreachBound() {
    let provider = MockProvider::failing_for(vec![
        "slide text 00".to_string(),
        "slide text 20".to_string(),
    ]);
    let engine = engine_with(provider.clone());

    let outcome = engine
        .translate_batch(numbered_request(40, 5, 3))
        .await
        .unwrap();

    assert!(provider.max_in_flight() <= 3);
    // Two failed sub-batches of five fragments each
    assert_eq!(outcome.fallback_count, 10);
}
