/*!
 * # transdeck - Batch Translation Orchestration Engine
 *
 * A Rust library that turns an arbitrary list of presentation text
 * fragments into translated fragments by talking to a rate-limited,
 * occasionally-failing LLM API.
 *
 * ## Features
 *
 * - Content-addressed caching: text already translated for a target
 *   language and model is never re-translated
 * - Bounded concurrency and rolling-window rate limiting for outbound
 *   API calls
 * - Partial-failure tolerance: failed sub-batches degrade to the original
 *   text instead of discarding completed work
 * - Monotonic progress reporting for polling or streaming callers
 * - Cooperative cancellation between sub-batch dispatches
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management and provider profiles
 * - `translation`: The orchestration engine:
 *   - `translation::fragment`: Fragment and request/outcome data model
 *   - `translation::cache`: Caching mechanisms for translations
 *   - `translation::retry`: Exponential-backoff retry wrapper
 *   - `translation::rate_gate`: Outbound call limiting
 *   - `translation::processor`: Partial-success batch processing
 *   - `translation::orchestrator`: The composition root
 * - `providers`: Client implementations for various LLM providers:
 *   - `providers::anthropic`: Anthropic API client
 *   - `providers::openai`: OpenAI API client
 *   - `providers::mock`: Scripted provider for tests
 * - `errors`: Custom error types for the engine
 *
 * ## Usage
 *
 * ```no_run
 * use transdeck::app_config::EngineConfig;
 * use transdeck::translation::{Fragment, TranslationEngine, TranslationRequest};
 *
 * # async fn run() -> Result<(), Box<dyn std::error::Error>> {
 * let config = EngineConfig::default().with_api_key("sk-...");
 * let engine = TranslationEngine::new(config)?;
 *
 * let request = TranslationRequest::new(
 *     vec![
 *         Fragment::new("slide1-title", "Quarterly Results"),
 *         Fragment::new("slide1-body", "Revenue grew 12% year over year."),
 *     ],
 *     "ja",
 * );
 *
 * let outcome = engine.translate_batch(request).await?;
 * assert_eq!(outcome.fragments.len(), 2);
 * # Ok(())
 * # }
 * ```
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{EngineConfig, TranslationProvider};
pub use errors::{CacheStoreError, EngineError, ProviderError, TranslationError};
pub use translation::{
    CancellationFlag, Fragment, ProgressEvent, TranslatedFragment, TranslationEngine,
    TranslationOutcome, TranslationRequest, TranslationSource,
};
