/*!
 * Mock provider implementations for testing.
 *
 * The mock answers marker-delimited payloads the way a well-behaved model
 * would, or misbehaves on demand:
 * - `MockProvider::working()` - translates every fragment
 * - `MockProvider::failing()` - always fails with a server error
 * - `MockProvider::failing_for(needles)` - fails any sub-batch whose
 *   payload contains one of the needles, deterministically across retries
 * - `MockProvider::flaky(n)` - fails the first n calls, then succeeds
 * - `MockProvider::missing_markers()` - returns text without markers
 * - `MockProvider::empty()` - returns an empty response
 *
 * Instrumentation counters (total calls, peak concurrent calls) back the
 * cache-idempotence and concurrency-bound tests.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderRequest, ProviderResponse};
use crate::translation::prompts::{count_fragment_markers, parse_batch_response};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Translate every fragment, preserving markers
    Working,

    /// Always fail with a 500 server error
    Failing,

    /// Always fail with the given HTTP status (e.g. 400 for a permanent,
    /// non-retryable failure)
    FailingWithStatus(u16),

    /// Fail any request whose payload contains one of these substrings;
    /// keyed to content so retries of the same sub-batch fail identically
    FailMatching(Vec<String>),

    /// Fail the first N calls with a 503, then behave like `Working`
    FlakyThenSuccess {
        /// Calls to fail before recovering
        fail_first: usize,
    },

    /// Return an HTTP-200 response whose markers have been stripped
    MissingMarkers,

    /// Return an empty response body
    Empty,
}

/// Mock provider with scripted behavior and instrumentation
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Total completed `complete` calls
    calls: Arc<AtomicUsize>,
    /// Calls currently in flight
    in_flight: Arc<AtomicUsize>,
    /// Peak concurrent in-flight calls observed
    max_in_flight: Arc<AtomicUsize>,
    /// Artificial latency per call, to force request overlap in tests
    delay: Option<Duration>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that always fails with the given HTTP status
    pub fn failing_with_status(status_code: u16) -> Self {
        Self::new(MockBehavior::FailingWithStatus(status_code))
    }

    /// Create a mock that fails sub-batches containing any needle
    pub fn failing_for(needles: Vec<String>) -> Self {
        Self::new(MockBehavior::FailMatching(needles))
    }

    /// Create a mock that fails the first `fail_first` calls
    pub fn flaky(fail_first: usize) -> Self {
        Self::new(MockBehavior::FlakyThenSuccess { fail_first })
    }

    /// Create a mock that returns responses without markers
    pub fn missing_markers() -> Self {
        Self::new(MockBehavior::MissingMarkers)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Add artificial latency to each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total `complete` calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Peak number of simultaneously in-flight calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Translate a payload the way a cooperative model would: each
    /// fragment's text is prefixed with `[TRANSLATED]`, markers intact.
    pub fn translate_payload(payload: &str) -> String {
        let count = count_fragment_markers(payload);
        let texts = match parse_batch_response(payload, count) {
            Ok(texts) => texts,
            Err(_) => return payload.to_string(),
        };

        let mut response = String::new();
        for (index, text) in texts.iter().enumerate() {
            response.push_str(&format!("<<FRAGMENT_{}>>\n", index));
            response.push_str(&format!("[TRANSLATED] {}\n", text));
        }
        response.push_str("<<END>>");
        response
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            calls: Arc::clone(&self.calls),
            in_flight: Arc::clone(&self.in_flight),
            max_in_flight: Arc::clone(&self.max_in_flight),
            delay: self.delay,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call_number = self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Working => Ok(ProviderResponse {
                text: Self::translate_payload(&request.payload),
                prompt_tokens: Some(request.payload.len() as u64),
                completion_tokens: Some((request.payload.len() / 2) as u64),
            }),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),

            MockBehavior::FailingWithStatus(status_code) => Err(ProviderError::ApiError {
                status_code: *status_code,
                message: format!("Simulated {} failure", status_code),
            }),

            MockBehavior::FailMatching(needles) => {
                if needles.iter().any(|n| request.payload.contains(n)) {
                    Err(ProviderError::ApiError {
                        status_code: 500,
                        message: "Simulated failure for matched sub-batch".to_string(),
                    })
                } else {
                    Ok(ProviderResponse {
                        text: Self::translate_payload(&request.payload),
                        prompt_tokens: Some(10),
                        completion_tokens: Some(10),
                    })
                }
            }

            MockBehavior::FlakyThenSuccess { fail_first } => {
                if call_number < *fail_first {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated transient failure #{}", call_number + 1),
                    })
                } else {
                    Ok(ProviderResponse {
                        text: Self::translate_payload(&request.payload),
                        prompt_tokens: Some(10),
                        completion_tokens: Some(10),
                    })
                }
            }

            MockBehavior::MissingMarkers => Ok(ProviderResponse {
                text: "Translated text with every marker stripped out".to_string(),
                prompt_tokens: Some(10),
                completion_tokens: Some(10),
            }),

            MockBehavior::Empty => Ok(ProviderResponse {
                text: String::new(),
                prompt_tokens: Some(0),
                completion_tokens: Some(0),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
