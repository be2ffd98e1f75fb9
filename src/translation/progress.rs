/*!
 * Progress reporting for translation requests.
 *
 * The engine emits one event after every sub-batch settles plus a final
 * completion event. Progress is monotonically non-decreasing and reaches
 * 100% exactly once, at job completion, regardless of how many sub-batches
 * failed. The transport (polling endpoint, push channel) is a collaborator
 * concern; only the event shape is fixed here.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::debug;

/// A point-in-time progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Fragments resolved so far (cache, API, or fallback)
    pub completed_fragments: usize,

    /// Total fragments in the request
    pub total_fragments: usize,

    /// `completed / total * 100`; 100.0 exactly once, at completion
    pub percentage: f64,
}

/// Callback receiving progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Tracks fragment completion for one request and pushes events to an
/// optional sink. Safe to share across concurrent sub-batch workers.
pub struct ProgressReporter {
    total: usize,
    completed: AtomicUsize,
    complete_emitted: AtomicBool,
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    /// Create a reporter for `total` fragments
    pub fn new(total: usize, callback: Option<ProgressCallback>) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            complete_emitted: AtomicBool::new(false),
            callback,
        }
    }

    /// Record that `count` more fragments resolved and emit an event.
    ///
    /// Counts saturate at the total, so double-counting bugs upstream can
    /// never push progress past 100.
    pub fn record(&self, count: usize) {
        if count == 0 {
            return;
        }
        let previous = self.completed.fetch_add(count, Ordering::SeqCst);
        let completed = (previous + count).min(self.total);
        self.emit(completed);
    }

    /// Emit the terminal 100% event unless a `record` call already crossed
    /// the finish line. Also covers the zero-fragment request, which
    /// completes without any sub-batch settling.
    pub fn finish(&self) {
        self.emit(self.total);
    }

    /// Fragments recorded so far, clamped to the total
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst).min(self.total)
    }

    fn emit(&self, completed: usize) {
        let at_end = completed >= self.total;
        if at_end && self.complete_emitted.swap(true, Ordering::SeqCst) {
            // 100% already went out; never repeat it
            return;
        }

        let percentage = if self.total == 0 {
            100.0
        } else {
            completed as f64 / self.total as f64 * 100.0
        };
        debug!(
            "Progress: {}/{} fragments ({:.1}%)",
            completed, self.total, percentage
        );

        if let Some(callback) = &self.callback {
            callback(ProgressEvent {
                completed_fragments: completed,
                total_fragments: self.total,
                percentage,
            });
        }
    }
}
