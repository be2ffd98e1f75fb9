/*!
 * Partial-success batch processing.
 *
 * A generic concurrency-bounded executor that runs N independent units of
 * work, collects successes and failures separately, and judges the overall
 * job against a success-rate threshold. Failed and skipped sub-results are
 * returned alongside the successes -- completed work is never discarded,
 * even when the job as a whole is rejected. The processor knows nothing
 * about translation; any "many independent fallible sub-tasks, accept
 * graceful degradation" workload fits.
 */

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};
use log::{debug, warn};

/// Cooperative cancellation signal shared between a caller and a running
/// job. Cancelling lets in-flight work finish but prevents new work from
/// starting.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Create a fresh, uncancelled flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Options shaping one processing job.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Maximum items processed concurrently
    pub concurrency: usize,

    /// Keep dispatching after a failure; when false, the first failure
    /// stops new dispatches (in-flight items still finish)
    pub continue_on_error: bool,

    /// Minimum success rate (`0.0..=1.0`) for the job to be accepted
    pub min_success_rate: f64,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            concurrency: 3,
            continue_on_error: true,
            min_success_rate: 0.7,
        }
    }
}

/// Outcome of one job: successes and failures keyed by item index, plus
/// indices that were never started.
#[derive(Debug)]
pub struct JobReport<T, E> {
    /// Item index paired with the worker's success value
    pub successes: Vec<(usize, T)>,

    /// Item index paired with the worker's error
    pub failures: Vec<(usize, E)>,

    /// Indices skipped because dispatch stopped (cancellation, or
    /// `continue_on_error = false` after a failure)
    pub skipped: Vec<usize>,

    /// `successes / total`; 1.0 for an empty job
    pub success_rate: f64,

    /// Whether `success_rate` met the configured minimum
    pub accepted: bool,
}

impl<T, E> JobReport<T, E> {
    /// Total number of items the job was asked to process
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len() + self.skipped.len()
    }

    /// Whether every item succeeded
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

enum Settled<T, E> {
    Success(usize, T),
    Failure(usize, E),
    Skipped(usize),
}

/// Concurrency-bounded executor with partial-success semantics.
pub struct BatchProcessor {
    options: ProcessorOptions,
}

impl BatchProcessor {
    /// Create a processor with the given options
    pub fn new(options: ProcessorOptions) -> Self {
        Self { options }
    }

    /// Process every item through `worker`, honouring the configured
    /// concurrency. `on_item_complete(index, success)` fires as each item
    /// settles, in completion order.
    pub async fn process<I, T, E, W, Fut, C>(
        &self,
        items: Vec<I>,
        worker: W,
        on_item_complete: C,
    ) -> JobReport<T, E>
    where
        W: Fn(I, usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnMut(usize, bool),
    {
        self.process_with_cancellation(items, worker, on_item_complete, &CancellationFlag::new())
            .await
    }

    /// Like [`process`](Self::process), observing a cancellation flag
    /// between dispatches: once cancelled, in-flight items finish and every
    /// undispatched item is reported as skipped.
    pub async fn process_with_cancellation<I, T, E, W, Fut, C>(
        &self,
        items: Vec<I>,
        worker: W,
        mut on_item_complete: C,
        cancel: &CancellationFlag,
    ) -> JobReport<T, E>
    where
        W: Fn(I, usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnMut(usize, bool),
    {
        let total = items.len();
        let concurrency = self.options.concurrency.max(1);
        let stop = AtomicBool::new(false);
        let worker = &worker;
        let stop_ref = &stop;

        let mut settled_stream = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move {
                // Checked when the future first enters the buffer: nothing
                // new starts after cancellation or a stop request
                if cancel.is_cancelled() || stop_ref.load(Ordering::SeqCst) {
                    return Settled::Skipped(index);
                }
                match worker(item, index).await {
                    Ok(value) => Settled::Success(index, value),
                    Err(error) => Settled::Failure(index, error),
                }
            })
            .buffer_unordered(concurrency);

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = Vec::new();

        while let Some(settled) = settled_stream.next().await {
            match settled {
                Settled::Success(index, value) => {
                    on_item_complete(index, true);
                    successes.push((index, value));
                }
                Settled::Failure(index, error) => {
                    on_item_complete(index, false);
                    if !self.options.continue_on_error {
                        stop.store(true, Ordering::SeqCst);
                    }
                    failures.push((index, error));
                }
                Settled::Skipped(index) => {
                    skipped.push(index);
                }
            }
        }

        // Report in item order, not completion order
        successes.sort_by_key(|(index, _)| *index);
        failures.sort_by_key(|(index, _)| *index);
        skipped.sort_unstable();

        let success_rate = if total == 0 {
            1.0
        } else {
            successes.len() as f64 / total as f64
        };
        let accepted = success_rate >= self.options.min_success_rate;

        if failures.is_empty() && skipped.is_empty() {
            debug!("Job completed: {}/{} items succeeded", successes.len(), total);
        } else {
            warn!(
                "Job settled with degradation: {} succeeded, {} failed, {} skipped (rate {:.3}, accepted: {})",
                successes.len(),
                failures.len(),
                skipped.len(),
                success_rate,
                accepted
            );
        }

        JobReport {
            successes,
            failures,
            skipped,
            success_rate,
            accepted,
        }
    }
}
