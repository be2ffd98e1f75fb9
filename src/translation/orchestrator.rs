/*!
 * Translation orchestration.
 *
 * The composition root of the engine. One `translate_batch` call walks a
 * request through four phases:
 *
 * 1. Planning: validate fragments, probe the cache, partition into cached
 *    and uncached, deduplicate uncached fragments by normalized text
 * 2. Dispatching: chunk the unique uncached texts into sub-batches and
 *    drive the partial-success batch processor; each worker acquires a
 *    rate-gate permit, calls the provider through the retry wrapper, and
 *    parses the marker-delimited response
 * 3. Merging: write API results, cache hits, and fallbacks into the
 *    output slots; failed or skipped sub-batches degrade to the original
 *    text rather than failing the request
 * 4. Completed: return the fragments in input order with the aggregate
 *    success rate and fallback count
 *
 * Only configuration problems and malformed requests raise; everything
 * else degrades. A presentation with some untranslated slides is more
 * useful to the end user than a hard failure of the whole request.
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::app_config::{EngineConfig, TranslationProvider};
use crate::errors::{EngineError, TranslationError};
use crate::providers::anthropic::Anthropic;
use crate::providers::openai::OpenAI;
use crate::providers::{Provider, ProviderRequest};
use crate::translation::cache::{EvictionPolicy, TranslationCache, normalize_source_text};
use crate::translation::fragment::{
    Fragment, TranslatedFragment, TranslationOutcome, TranslationRequest, TranslationSource,
};
use crate::translation::processor::{BatchProcessor, CancellationFlag, ProcessorOptions};
use crate::translation::progress::{ProgressCallback, ProgressReporter};
use crate::translation::prompts::{PromptTemplate, build_batch_payload, parse_batch_response};
use crate::translation::rate_gate::{RateGate, RateGateConfig};
use crate::translation::retry::{RetryPolicy, retry};

/// Phases a request moves through, in order. Terminal state is `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    /// Validating fragments and probing the cache
    Planning,
    /// Sub-batches in flight
    Dispatching,
    /// Assembling the ordered output
    Merging,
    /// Done; outcome available
    Completed,
}

impl std::fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Merging => write!(f, "merging"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// One unique uncached text and the input positions it resolves.
///
/// The planning dedup groups fragments whose normalized text is identical,
/// so repeated slide text (headers, footers, repeated labels) costs one
/// API fragment no matter how often it appears.
struct PendingText {
    /// First fragment seen with this text; its original goes in the payload
    representative: Fragment,
    /// Input positions resolved by this text's translation
    indices: Vec<usize>,
}

/// The batch translation engine.
pub struct TranslationEngine {
    provider: Arc<dyn Provider>,
    cache: TranslationCache,
    rate_gate: RateGate,
    retry_policy: RetryPolicy,
    config: EngineConfig,
}

impl TranslationEngine {
    /// Create an engine from configuration, constructing the provider
    /// client. Fails fast on configuration problems (missing API key).
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let provider: Arc<dyn Provider> = match config.provider {
            TranslationProvider::Anthropic => Arc::new(Anthropic::new_with_timeout(
                config.api_key.clone(),
                config.endpoint.clone(),
                timeout,
            )),
            TranslationProvider::OpenAI => Arc::new(OpenAI::new_with_timeout(
                config.api_key.clone(),
                config.endpoint.clone(),
                timeout,
            )),
        };

        Ok(Self::assemble(config, provider))
    }

    /// Create an engine around an injected provider (tests, custom
    /// backends). Credentials are the provider's concern here; only the
    /// numeric configuration is validated.
    pub fn with_provider(
        config: EngineConfig,
        provider: Arc<dyn Provider>,
    ) -> Result<Self, EngineError> {
        config.validate_limits().map_err(EngineError::Config)?;
        Ok(Self::assemble(config, provider))
    }

    fn assemble(config: EngineConfig, provider: Arc<dyn Provider>) -> Self {
        let cache = if config.cache.enabled {
            TranslationCache::in_memory(eviction_policy(&config))
        } else {
            TranslationCache::disabled()
        };

        let rate_gate = RateGate::new(RateGateConfig {
            max_in_flight: config.concurrent_requests,
            max_per_window: config.rate_limit,
            window: Duration::from_secs(60),
        });

        let retry_policy = RetryPolicy {
            max_attempts: config.retry.max_attempts,
            backoff_base: Duration::from_millis(config.retry.backoff_base_ms),
            backoff_cap: Duration::from_millis(config.retry.backoff_cap_ms),
            total_wait_cap: Duration::from_millis(config.retry.total_wait_cap_ms),
            jitter: config.retry.jitter,
        };

        info!(
            "Translation engine ready: provider={}, model={}, batch_size={}, concurrency={}",
            provider.name(),
            config.model,
            config.batch_size,
            config.concurrent_requests
        );

        Self {
            provider,
            cache,
            rate_gate,
            retry_policy,
            config,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cache effectiveness counters
    pub fn cache_stats(&self) -> crate::translation::cache::CacheStats {
        self.cache.stats()
    }

    /// Translate a batch of fragments with no progress sink and no
    /// cancellation signal.
    pub async fn translate_batch(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationOutcome, EngineError> {
        self.translate_batch_with_progress(request, None, &CancellationFlag::new())
            .await
    }

    /// Translate a batch of fragments, emitting a progress event after
    /// every sub-batch settles and honouring a cancellation signal between
    /// dispatches.
    pub async fn translate_batch_with_progress(
        &self,
        request: TranslationRequest,
        progress: Option<ProgressCallback>,
        cancel: &CancellationFlag,
    ) -> Result<TranslationOutcome, EngineError> {
        let mut phase = RequestPhase::Planning;
        debug!("Request phase: {}", phase);

        validate_request(&request)?;

        let model = if request.model.is_empty() {
            self.config.model.clone()
        } else {
            request.model.clone()
        };
        let batch_size = if request.batch_size > 0 {
            request.batch_size
        } else {
            self.config.batch_size
        };
        let concurrency = if request.concurrency > 0 {
            request.concurrency
        } else {
            self.config.concurrent_requests
        };

        let fragments = &request.fragments;
        let total = fragments.len();
        let reporter = ProgressReporter::new(total, progress);
        let mut slots: Vec<Option<TranslatedFragment>> = vec![None; total];

        // Planning: validate, probe cache, dedup the uncached remainder
        let mut pending: Vec<PendingText> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut resolved_upfront = 0usize;
        let mut rejected_count = 0usize;

        for (index, fragment) in fragments.iter().enumerate() {
            if let Some(reason) = reject_reason(fragment, self.config.max_chars_per_fragment) {
                warn!("Fragment '{}' rejected by validation: {}", fragment.id, reason);
                slots[index] = Some(TranslatedFragment::fallback(fragment));
                resolved_upfront += 1;
                rejected_count += 1;
                continue;
            }

            if let Some(cached) = self
                .cache
                .get(&fragment.original, &request.target_language, &model)
                .await
            {
                slots[index] =
                    Some(TranslatedFragment::new(fragment, cached, TranslationSource::Cache));
                resolved_upfront += 1;
                continue;
            }

            let key = normalize_source_text(&fragment.original);
            match by_key.get(&key) {
                Some(&position) => pending[position].indices.push(index),
                None => {
                    by_key.insert(key, pending.len());
                    pending.push(PendingText {
                        representative: fragment.clone(),
                        indices: vec![index],
                    });
                }
            }
        }

        reporter.record(resolved_upfront);

        // Dispatching: chunk unique texts into sub-batches and run them
        // through the partial-success processor
        let chunks = chunk_pending(pending, batch_size);
        let total_chunks = chunks.len();
        let fragments_per_chunk: Vec<usize> = chunks
            .iter()
            .map(|chunk| chunk.iter().map(|entry| entry.indices.len()).sum())
            .collect();

        let mut successes: Vec<(usize, Vec<String>)> = Vec::new();
        let mut failures: Vec<(usize, TranslationError)> = Vec::new();
        let mut skipped: Vec<usize> = Vec::new();

        if total_chunks == 0 {
            debug!("All fragments resolved during planning, skipping dispatch");
        } else {
            phase = RequestPhase::Dispatching;
            debug!(
                "Request phase: {} ({} sub-batches of at most {} fragments)",
                phase, total_chunks, batch_size
            );

            let system_prompt = PromptTemplate::presentation_translator()
                .render(&request.source_language, &request.target_language);

            let worker = |chunk_index: usize, _wave_position: usize| {
                let chunks = &chunks;
                let model = &model;
                let system_prompt = &system_prompt;
                let target_language = &request.target_language;
                async move {
                    let chunk = &chunks[chunk_index];
                    let payload_fragments: Vec<Fragment> = chunk
                        .iter()
                        .map(|entry| entry.representative.clone())
                        .collect();
                    let payload = build_batch_payload(&payload_fragments);

                    // Held across retries; released on every exit path
                    let _permit = self.rate_gate.acquire().await;

                    let translations = retry(
                        &self.retry_policy,
                        TranslationError::is_retryable,
                        |attempt, error: &TranslationError| {
                            warn!(
                                "Sub-batch {} attempt {} failed: {}",
                                chunk_index, attempt, error
                            );
                        },
                        || {
                            let provider = Arc::clone(&self.provider);
                            let provider_request = ProviderRequest {
                                model: model.clone(),
                                system_prompt: system_prompt.clone(),
                                payload: payload.clone(),
                                temperature: self.config.temperature,
                                max_tokens: self.config.max_tokens,
                            };
                            let expected = chunk.len();
                            async move {
                                let response = provider
                                    .complete(provider_request)
                                    .await
                                    .map_err(TranslationError::from)?;
                                parse_batch_response(&response.text, expected)
                            }
                        },
                    )
                    .await?;

                    // Populate the cache before merging so entries survive
                    // even if a later sub-batch in this request fails
                    for (entry, translated) in chunk.iter().zip(&translations) {
                        self.cache
                            .insert(
                                &entry.representative.original,
                                target_language,
                                model,
                                translated,
                            )
                            .await;
                    }

                    Ok::<Vec<String>, TranslationError>(translations)
                }
            };

            let processor = BatchProcessor::new(ProcessorOptions {
                concurrency,
                continue_on_error: true,
                min_success_rate: self.config.min_success_rate,
            });

            let wave_size = self.config.max_wave_size.unwrap_or(total_chunks);
            let mut wave_start = 0;
            while wave_start < total_chunks {
                if cancel.is_cancelled() {
                    skipped.extend(wave_start..total_chunks);
                    break;
                }

                let wave_end = (wave_start + wave_size).min(total_chunks);
                let report = processor
                    .process_with_cancellation(
                        (wave_start..wave_end).collect(),
                        &worker,
                        |wave_position, _success| {
                            reporter.record(fragments_per_chunk[wave_start + wave_position]);
                        },
                        cancel,
                    )
                    .await;

                successes.extend(
                    report
                        .successes
                        .into_iter()
                        .map(|(position, value)| (wave_start + position, value)),
                );
                failures.extend(
                    report
                        .failures
                        .into_iter()
                        .map(|(position, error)| (wave_start + position, error)),
                );
                skipped.extend(report.skipped.into_iter().map(|position| wave_start + position));

                wave_start = wave_end;
            }
        }

        // Merging: write every resolution into its input-ordered slot
        phase = RequestPhase::Merging;
        debug!("Request phase: {}", phase);

        for (chunk_index, translations) in &successes {
            for (entry, translated) in chunks[*chunk_index].iter().zip(translations) {
                for &index in &entry.indices {
                    slots[index] = Some(TranslatedFragment::new(
                        &fragments[index],
                        translated.clone(),
                        TranslationSource::Api,
                    ));
                }
            }
        }
        for (chunk_index, error) in &failures {
            warn!(
                "Sub-batch {} exhausted retries, falling back to original text: {}",
                chunk_index, error
            );
            for entry in &chunks[*chunk_index] {
                for &index in &entry.indices {
                    slots[index] = Some(TranslatedFragment::fallback(&fragments[index]));
                }
            }
        }
        for chunk_index in &skipped {
            for entry in &chunks[*chunk_index] {
                for &index in &entry.indices {
                    slots[index] = Some(TranslatedFragment::cancelled(&fragments[index]));
                }
            }
        }

        let output: Vec<TranslatedFragment> = slots
            .into_iter()
            .zip(fragments.iter())
            .map(|(slot, fragment)| slot.unwrap_or_else(|| TranslatedFragment::fallback(fragment)))
            .collect();

        // Success rate is fragment-weighted over the fragments that were
        // eligible for translation; validation rejections are excluded
        // from both sides of the ratio
        let counted = total - rejected_count;
        let translated_fragments = output
            .iter()
            .filter(|f| f.source != TranslationSource::Fallback)
            .count();
        let success_rate = if counted == 0 {
            1.0
        } else {
            translated_fragments as f64 / counted as f64
        };
        let accepted = success_rate >= self.config.min_success_rate;
        let fallback_count = output
            .iter()
            .filter(|f| f.source == TranslationSource::Fallback)
            .count();

        reporter.finish();
        phase = RequestPhase::Completed;
        info!(
            "Request {}: {} fragments, {} sub-batches ({} failed, {} skipped), success rate {:.3}, {} fallbacks",
            phase,
            total,
            total_chunks,
            failures.len(),
            skipped.len(),
            success_rate,
            fallback_count
        );

        Ok(TranslationOutcome {
            fragments: output,
            success_rate,
            accepted,
            fallback_count,
            cancelled: cancel.is_cancelled(),
        })
    }
}

/// Request-level validation: problems here are caller errors, not
/// degradable fragment conditions.
fn validate_request(request: &TranslationRequest) -> Result<(), EngineError> {
    if request.target_language.trim().is_empty() {
        return Err(EngineError::InvalidRequest(
            "target_language is empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(request.fragments.len());
    for fragment in &request.fragments {
        if !seen.insert(fragment.id.as_str()) {
            return Err(EngineError::InvalidRequest(format!(
                "duplicate fragment id '{}'",
                fragment.id
            )));
        }
    }
    Ok(())
}

/// Per-fragment validation. A `Some` return rejects the fragment before
/// dispatch; it falls back to its original text and is not counted
/// against the success rate.
fn reject_reason(fragment: &Fragment, max_chars: usize) -> Option<String> {
    if fragment.original.trim().is_empty() {
        return Some("text is empty".to_string());
    }
    if fragment.original.chars().count() > max_chars {
        return Some(format!(
            "text exceeds {} characters ({})",
            max_chars,
            fragment.original.chars().count()
        ));
    }
    None
}

/// Split pending texts into sub-batches of at most `batch_size`.
fn chunk_pending(pending: Vec<PendingText>, batch_size: usize) -> Vec<Vec<PendingText>> {
    let batch_size = batch_size.max(1);
    let mut chunks = Vec::new();
    let mut current = Vec::with_capacity(batch_size);
    for entry in pending {
        current.push(entry);
        if current.len() == batch_size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn eviction_policy(config: &EngineConfig) -> EvictionPolicy {
    match (config.cache.ttl_secs, config.cache.max_entries) {
        (Some(ttl), Some(max_entries)) => EvictionPolicy::TtlAndMaxEntries {
            ttl: Duration::from_secs(ttl),
            max_entries,
        },
        (Some(ttl), None) => EvictionPolicy::Ttl(Duration::from_secs(ttl)),
        (None, Some(max_entries)) => EvictionPolicy::MaxEntries(max_entries),
        (None, None) => EvictionPolicy::Unbounded,
    }
}
