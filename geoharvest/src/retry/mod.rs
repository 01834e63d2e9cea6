//! Retry policies and cooperative cancellation.
//!
//! Network calls in this crate never loop forever: every retryable
//! operation runs under a [`RetryPolicy`] with a maximum attempt count and
//! (for backoff policies) jittered, capped delays, and observes a
//! [`CancelFlag`] between attempts so an interrupted run stops at the next
//! attempt boundary instead of hanging in a sleep-retry cycle.

use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Default initial delay for exponential backoff (100ms).
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;

/// Default maximum delay for exponential backoff (30 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Cooperative cancellation flag shared across workers.
///
/// Cloning is cheap; all clones observe the same flag. Once cancelled the
/// flag never resets.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Errors a transient failure can carry.
///
/// Implemented by error types whose failures divide into retryable
/// (transport-level) and permanent classes.
pub trait Retryable {
    /// Whether retrying the failed operation could plausibly succeed.
    fn is_retryable(&self) -> bool;
}

/// How an operation handles transient failures.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// No retries - fail immediately on error.
    None,

    /// Fixed number of retries with constant delay between attempts.
    Fixed {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Delay between retry attempts.
        delay: Duration,
    },

    /// Exponential backoff with jitter.
    ///
    /// The delay doubles after each failed attempt up to a cap, and each
    /// sleep is scaled by a random factor in [0.5, 1.5) so synchronized
    /// workers don't hammer a recovering endpoint in lockstep.
    ExponentialBackoff {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Initial delay after the first failure.
        initial_delay: Duration,
        /// Maximum delay cap (delay won't exceed this).
        max_delay: Duration,
        /// Multiplier applied to delay after each failure (typically 2.0).
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(5)
    }
}

impl RetryPolicy {
    /// Exponential backoff with the default delay parameters.
    pub fn exponential(max_attempts: u32) -> Self {
        Self::ExponentialBackoff {
            max_attempts,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Fixed delay between a bounded number of attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::Fixed {
            max_attempts,
            delay,
        }
    }

    /// Base delay before the retry following failed attempt `attempt`
    /// (1-based), or `None` when the attempt budget is spent.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed {
                max_attempts,
                delay,
            } => (attempt < *max_attempts).then_some(*delay),
            Self::ExponentialBackoff {
                max_attempts,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                let delay_ms = (initial_delay.as_millis() as f64 * factor)
                    .min(max_delay.as_millis() as f64);
                Some(Duration::from_millis(delay_ms as u64))
            }
        }
    }

    /// Maximum number of attempts for this policy.
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Fixed { max_attempts, .. } => *max_attempts,
            Self::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }
}

/// Outcome of a retried operation that did not succeed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetryError<E> {
    /// The underlying error was permanent; no retry was attempted.
    #[error("permanent failure: {0}")]
    Permanent(E),

    /// Every allowed attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: E },

    /// Cancellation was requested between attempts.
    #[error("operation cancelled")]
    Cancelled,
}

/// Runs `op` under `policy`, sleeping between retryable failures and
/// checking `cancel` before every attempt.
pub fn run_with_retry<T, E, F>(
    policy: &RetryPolicy,
    cancel: &CancelFlag,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable,
    F: FnMut() -> Result<T, E>,
{
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(RetryError::Permanent(e)),
            Err(e) => match policy.delay_for_attempt(attempt) {
                Some(base) => {
                    let jittered = jitter(base);
                    trace!(attempt, backoff_ms = jittered.as_millis() as u64, "retrying after transient failure");
                    std::thread::sleep(jittered);
                }
                None => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source: e,
                    })
                }
            },
        }
    }
}

/// Scales a delay by a random factor in [0.5, 1.5).
fn jitter(base: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }
    base.mul_f64(rand::rng().random_range(0.5..1.5))
}
