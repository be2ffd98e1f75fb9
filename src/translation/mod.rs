/*!
 * Batch translation engine internals.
 *
 * This module contains the core functionality for translating fragment
 * batches through LLM providers. It is split into several submodules:
 *
 * - `fragment`: Data model for fragments, requests, and outcomes
 * - `cache`: Content-addressed caching of translations
 * - `retry`: Generic exponential-backoff retry wrapper
 * - `rate_gate`: Concurrency and throughput limiting for outbound calls
 * - `processor`: Partial-success batch processing
 * - `prompts`: Prompt construction and marker-based response parsing
 * - `progress`: Monotonic progress reporting
 * - `orchestrator`: The composition root driving all of the above
 */

// Re-export main types for easier usage
pub use self::cache::{CacheEntry, CacheStats, CacheStore, EvictionPolicy, TranslationCache};
pub use self::fragment::{
    Fragment, TranslatedFragment, TranslationOutcome, TranslationRequest, TranslationSource,
};
pub use self::orchestrator::{RequestPhase, TranslationEngine};
pub use self::processor::{BatchProcessor, CancellationFlag, JobReport, ProcessorOptions};
pub use self::progress::{ProgressCallback, ProgressEvent, ProgressReporter};
pub use self::rate_gate::{RateGate, RateGateConfig, RateGatePermit};
pub use self::retry::{RetryPolicy, retry, retry_always};

// Submodules
pub mod cache;
pub mod fragment;
pub mod orchestrator;
pub mod processor;
pub mod progress;
pub mod prompts;
pub mod rate_gate;
pub mod retry;
