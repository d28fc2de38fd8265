//! Circuit breaker for the analyzer boundary

use crate::config::CircuitBreakerConfig;
use crate::domain::DetectorError;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Consecutive-failure circuit breaker
///
/// Closed: calls pass. After `failure_threshold` consecutive failures the
/// breaker opens and rejects calls for `open_for`. Once that elapses a single
/// trial call is let through; its outcome closes or re-opens the breaker.
/// Callers arriving while the trial runs wait for that outcome.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    open_for: Duration,
    state: Mutex<BreakerState>,
    trial_settled: Notify,
}

/// Permission for one analyzer call
///
/// Report the outcome with [`CallPermit::succeeded`] or
/// [`CallPermit::failed`]. A permit dropped without an outcome (the call was
/// cancelled) releases the half-open trial so the next caller can take it.
#[must_use = "report the call outcome on the permit"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl CallPermit<'_> {
    /// Whether this permit holds the half-open trial
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Records a successful call
    pub fn succeeded(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    /// Records a failed call
    pub fn failed(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.settled || !self.trial {
            return;
        }
        self.breaker.lock().trial_in_flight = false;
        self.breaker.trial_settled.notify_waiters();
        tracing::debug!("PHI analyzer trial call abandoned");
    }
}

impl CircuitBreaker {
    /// Creates a closed breaker
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            open_for: Duration::from_millis(config.open_for_ms),
            state: Mutex::new(BreakerState::default()),
            trial_settled: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // State is plain counters, a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn permit(&self, trial: bool) -> CallPermit<'_> {
        CallPermit {
            breaker: self,
            trial,
            settled: false,
        }
    }

    /// Waits until a call may proceed
    ///
    /// Returns immediately when closed and fails fast while open. In the
    /// half-open window the first caller gets the trial and later callers
    /// wait for its outcome.
    ///
    /// # Errors
    ///
    /// [`DetectorError::CircuitOpen`] while the breaker is open.
    pub async fn acquire(&self) -> Result<CallPermit<'_>, DetectorError> {
        if self.failure_threshold == 0 {
            return Ok(self.permit(false));
        }

        loop {
            let settled = self.trial_settled.notified();
            {
                let mut state = self.lock();
                let Some(opened_at) = state.opened_at else {
                    return Ok(self.permit(false));
                };

                let elapsed = opened_at.elapsed();
                if elapsed < self.open_for {
                    return Err(DetectorError::CircuitOpen {
                        retry_after_ms: (self.open_for - elapsed).as_millis() as u64,
                    });
                }

                if !state.trial_in_flight {
                    state.trial_in_flight = true;
                    tracing::info!("PHI analyzer circuit half-open, allowing trial call");
                    return Ok(self.permit(true));
                }
            }
            settled.await;
        }
    }

    fn record_success(&self) {
        let mut state = self.lock();
        let was_trial = state.trial_in_flight;
        if state.opened_at.is_some() {
            tracing::info!("PHI analyzer circuit closed");
        }
        *state = BreakerState::default();
        drop(state);

        if was_trial {
            self.trial_settled.notify_waiters();
        }
    }

    fn record_failure(&self) {
        if self.failure_threshold == 0 {
            return;
        }

        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        let reopen = state.trial_in_flight;
        if reopen || state.consecutive_failures >= self.failure_threshold {
            if state.opened_at.is_none() || reopen {
                tracing::warn!(
                    consecutive_failures = state.consecutive_failures,
                    open_for_ms = self.open_for.as_millis() as u64,
                    "PHI analyzer circuit opened"
                );
            }
            state.opened_at = Some(Instant::now());
            state.trial_in_flight = false;
        }
        drop(state);

        if reopen {
            self.trial_settled.notify_waiters();
        }
    }

    /// Whether calls are currently being rejected
    pub fn is_open(&self) -> bool {
        let state = self.lock();
        state
            .opened_at
            .map(|opened| opened.elapsed() < self.open_for)
            .unwrap_or(false)
    }
}
