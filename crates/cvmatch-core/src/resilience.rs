//! Retry with exponential backoff and a consecutive-failure circuit breaker,
//! shared by the HTTP service clients.

use parking_lot::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of one attempt against an external service.
pub enum Attempt<T> {
    Done(T),
    /// Worth retrying: rate limit, server error, timeout, connection reset.
    Retryable(String),
    Fatal(String),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(500), max_delay: Duration::from_secs(16) }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        (self.base_delay * (1u32 << capped)).min(self.max_delay)
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: usize,
    open_until: Option<Instant>,
}

/// Opens after `threshold` consecutive failures and rejects calls until
/// `cooldown` has elapsed; the next call after that is a trial.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: usize,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(threshold: usize, cooldown: Duration) -> Self {
        Self { threshold: threshold.max(1), cooldown, state: Mutex::new(BreakerState::default()) }
    }

    pub fn allow(&self) -> bool {
        let mut state = self.state.lock();
        match state.open_until {
            Some(until) if Instant::now() < until => false,
            Some(_) => {
                state.open_until = None;
                true
            }
            None => true,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state.lock().open_until, Some(until) if Instant::now() < until)
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = 0;
        state.open_until = None;
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.threshold {
            state.open_until = Some(Instant::now() + self.cooldown);
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30))
    }
}

/// Runs `op` until it succeeds, fails fatally, or the retry budget is spent.
/// The error string is for the caller to wrap in its own error variant.
pub fn call_with_retry<T, F>(
    service: &str,
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    mut op: F,
) -> std::result::Result<T, String>
where
    F: FnMut() -> Attempt<T>,
{
    if !breaker.allow() {
        return Err(format!("{service}: circuit open after repeated failures"));
    }
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0usize;
    loop {
        match op() {
            Attempt::Done(value) => {
                breaker.record_success();
                return Ok(value);
            }
            Attempt::Retryable(reason) if attempt + 1 < max_attempts => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                debug!(service, attempt, ?delay, %reason, "retrying");
                thread::sleep(delay);
            }
            Attempt::Retryable(reason) | Attempt::Fatal(reason) => {
                breaker.record_failure();
                warn!(service, attempt, %reason, "call failed");
                return Err(format!("{service}: {reason}"));
            }
        }
    }
}
