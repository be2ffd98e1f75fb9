/*!
 * Common test utilities shared by unit and integration tests
 */

use std::sync::Arc;

use transdeck::app_config::EngineConfig;
use transdeck::providers::mock::MockProvider;
use transdeck::translation::{Fragment, TranslationEngine, TranslationRequest};

/// A fast engine configuration for tests: tight retry backoff, no rate
/// limiting window, cache enabled.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default().with_model("mock-model");
    config.retry.max_attempts = 3;
    config.retry.backoff_base_ms = 1;
    config.retry.backoff_cap_ms = 5;
    config.retry.total_wait_cap_ms = 1000;
    config.retry.jitter = 0.0;
    config.rate_limit = None;
    config
}

/// Build an engine around a mock provider with the fast test config
pub fn engine_with(provider: MockProvider) -> TranslationEngine {
    engine_with_config(provider, test_config())
}

/// Build an engine around a mock provider with a custom config
pub fn engine_with_config(provider: MockProvider, config: EngineConfig) -> TranslationEngine {
    TranslationEngine::with_provider(config, Arc::new(provider))
        .expect("test engine construction should succeed")
}

/// Generate `count` fragments with distinct ids and texts
pub fn numbered_fragments(count: usize) -> Vec<Fragment> {
    (0..count)
        .map(|i| Fragment::new(format!("frag-{:02}", i), format!("slide text {:02}", i)))
        .collect()
}

/// A request over `count` numbered fragments with explicit knobs
pub fn numbered_request(count: usize, batch_size: usize, concurrency: usize) -> TranslationRequest {
    TranslationRequest::new(numbered_fragments(count), "ja")
        .batch_size(batch_size)
        .concurrency(concurrency)
}

/// The translation the working mock produces for a given source text
pub fn mock_translation(original: &str) -> String {
    format!("[TRANSLATED] {}", original)
}
