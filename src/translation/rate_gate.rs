/*!
 * Rate gate bounding outbound API traffic.
 *
 * Two dimensions are limited independently: how many calls may be in flight
 * simultaneously (a fair FIFO semaphore) and how many calls may start per
 * rolling time window (a timestamp ledger). Both outbound LLM calls and a
 * structurally identical inbound limiter are parameterized from the same
 * gate; only the configuration differs per use site.
 *
 * Permits are RAII: dropping a `RateGatePermit` releases the in-flight slot
 * even when the guarded call errors or panics. `acquire` is cancel-safe --
 * dropping the future while it waits relinquishes any partially acquired
 * state and never consumes a window slot.
 */

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Limits applied by a [`RateGate`].
#[derive(Debug, Clone)]
pub struct RateGateConfig {
    /// Maximum concurrent in-flight calls
    pub max_in_flight: usize,

    /// Maximum calls started per rolling window, `None` for unlimited
    pub max_per_window: Option<u32>,

    /// Length of the rolling window
    pub window: Duration,
}

impl Default for RateGateConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 3,
            max_per_window: None,
            window: Duration::from_secs(60),
        }
    }
}

impl RateGateConfig {
    /// Gate bounding only concurrency
    pub fn concurrency_only(max_in_flight: usize) -> Self {
        Self {
            max_in_flight,
            ..Default::default()
        }
    }

    /// Gate bounding concurrency and calls per minute
    pub fn with_rate_limit(max_in_flight: usize, requests_per_minute: u32) -> Self {
        Self {
            max_in_flight,
            max_per_window: Some(requests_per_minute),
            window: Duration::from_secs(60),
        }
    }
}

/// Rolling-window ledger of call start times.
struct WindowLimiter {
    max_per_window: u32,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl WindowLimiter {
    fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            starts: Mutex::new(VecDeque::new()),
        }
    }

    /// Try to record a call start now. On refusal, returns how long to wait
    /// before the oldest recorded start leaves the window.
    fn try_start(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut starts = self.starts.lock();
        while let Some(front) = starts.front() {
            if now.duration_since(*front) >= self.window {
                starts.pop_front();
            } else {
                break;
            }
        }
        if (starts.len() as u32) < self.max_per_window {
            starts.push_back(now);
            Ok(())
        } else {
            let oldest = *starts.front().unwrap_or(&now);
            Err(self.window.saturating_sub(now.duration_since(oldest)))
        }
    }
}

/// Concurrency and throughput limiter guarding outbound calls.
pub struct RateGate {
    semaphore: Arc<Semaphore>,
    limiter: Option<WindowLimiter>,
    max_in_flight: usize,
}

/// An acquired in-flight slot; released on drop.
pub struct RateGatePermit {
    _permit: OwnedSemaphorePermit,
}

impl RateGate {
    /// Create a gate from the given limits
    pub fn new(config: RateGateConfig) -> Self {
        let max_in_flight = config.max_in_flight.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            limiter: config
                .max_per_window
                .map(|max| WindowLimiter::new(max.max(1), config.window)),
            max_in_flight,
        }
    }

    /// Acquire a permit, suspending until both an in-flight slot and a
    /// window slot are free.
    ///
    /// The underlying semaphore queues waiters in FIFO order, so sustained
    /// load cannot starve an early caller. Dropping the returned future
    /// cancels the acquire without leaking either slot.
    pub async fn acquire(&self) -> RateGatePermit {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("rate gate semaphore is never closed");

        if let Some(limiter) = &self.limiter {
            loop {
                match limiter.try_start() {
                    Ok(()) => break,
                    Err(wait) => {
                        debug!("Rate gate window full, waiting {:?}", wait);
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        RateGatePermit { _permit: permit }
    }

    /// Acquire without waiting; `None` when either dimension is exhausted
    pub fn try_acquire(&self) -> Option<RateGatePermit> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        if let Some(limiter) = &self.limiter {
            if limiter.try_start().is_err() {
                return None;
            }
        }
        Some(RateGatePermit { _permit: permit })
    }

    /// In-flight slots currently free
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Configured in-flight bound
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}
