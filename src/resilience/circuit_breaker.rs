//! Per-worker circuit breaker.
//!
//! # State Transitions
//! ```text
//! Closed → Open:      consecutive failures >= failure_threshold
//! Open → Half-Open:   lazily, on the first availability check after open_until
//! Half-Open → Closed: next successful invocation
//! Half-Open → Open:   next failure (the counter is never reset on entering Half-Open)
//! ```
//!
//! Half-Open admits one trial at a time. The slot is taken by
//! `begin_trial` and freed by `end_trial` or any state transition.
//!
//! The breaker is plain data: it lives inside a `WorkerState` and is only
//! touched while the registry lock is held.

use serde::Serialize;
use std::fmt;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// Worker assumed down; not selectable until the cooldown elapses.
    Open,
    /// Cooldown elapsed; the worker may take a trial request.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    worker_id: String,
    state: CircuitState,
    failures: u32,
    open_until: Option<Instant>,
    trial_in_flight: bool,
}

impl CircuitBreaker {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            state: CircuitState::Closed,
            failures: 0,
            open_until: None,
            trial_in_flight: false,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn open_until(&self) -> Option<Instant> {
        self.open_until
    }

    pub fn trial_in_flight(&self) -> bool {
        self.trial_in_flight
    }

    /// Whether the worker may receive traffic at `now`.
    ///
    /// An open breaker whose cooldown has elapsed flips to half-open here.
    /// A half-open breaker is available only while its trial slot is free.
    pub fn is_available(&mut self, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => !self.trial_in_flight,
            CircuitState::Open => {
                let elapsed = self.open_until.map_or(true, |until| now >= until);
                if elapsed {
                    self.transition(CircuitState::HalfOpen);
                }
                elapsed
            }
        }
    }

    /// Claim the half-open trial slot. Returns true if this call is the trial.
    pub fn begin_trial(&mut self) -> bool {
        if self.state == CircuitState::HalfOpen && !self.trial_in_flight {
            self.trial_in_flight = true;
            return true;
        }
        false
    }

    /// Free the trial slot once the trial call has returned.
    pub fn end_trial(&mut self) {
        self.trial_in_flight = false;
    }

    /// Record a successful invocation.
    pub fn record_success(&mut self) {
        self.failures = 0;
        if self.state == CircuitState::HalfOpen {
            self.open_until = None;
            self.transition(CircuitState::Closed);
        }
    }

    /// Record a failed invocation. Returns true if this failure opened the breaker.
    pub fn record_failure(&mut self, now: Instant, config: &CircuitBreakerConfig) -> bool {
        self.failures = self.failures.saturating_add(1);
        if self.state != CircuitState::Open && self.failures >= config.failure_threshold {
            self.open_until = Some(now + config.cooldown());
            self.transition(CircuitState::Open);
            return true;
        }
        false
    }

    fn transition(&mut self, to: CircuitState) {
        let from = self.state;
        self.state = to;
        self.trial_in_flight = false;
        tracing::info!(
            worker = %self.worker_id,
            from = %from,
            to = %to,
            failures = self.failures,
            "Circuit breaker state transition"
        );
        metrics::record_circuit_transition(&self.worker_id, from.as_str(), to.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }

    #[test]
    fn test_trips_after_threshold() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::new("w1");

        assert!(!cb.record_failure(now, &config()));
        assert!(!cb.record_failure(now, &config()));
        assert_eq!(cb.state(), CircuitState::Closed);

        assert!(cb.record_failure(now, &config()));
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.open_until(), Some(now + Duration::from_secs(60)));
        assert!(!cb.is_available(now + Duration::from_secs(59)));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_success_resets_counter() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::new("w1");
        cb.record_failure(now, &config());
        cb.record_failure(now, &config());
        cb.record_success();
        assert_eq!(cb.failures(), 0);
        cb.record_failure(now, &config());
        cb.record_failure(now, &config());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_recovery() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::new("w1");
        for _ in 0..3 {
            cb.record_failure(now, &config());
        }

        let later = now + Duration::from_secs(60);
        assert!(cb.is_available(later));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.failures(), 3);

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failures(), 0);
        assert_eq!(cb.open_until(), None);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::new("w1");
        for _ in 0..3 {
            cb.record_failure(now, &config());
        }

        let later = now + Duration::from_secs(61);
        assert!(cb.is_available(later));
        assert!(cb.record_failure(later, &config()));
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.open_until(), Some(later + Duration::from_secs(60)));
    }

    #[test]
    fn test_half_open_admits_one_trial() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::new("w1");
        for _ in 0..3 {
            cb.record_failure(now, &config());
        }

        let later = now + Duration::from_secs(60);
        assert!(cb.is_available(later));
        assert!(cb.begin_trial());
        assert!(!cb.is_available(later));
        assert!(!cb.begin_trial());

        cb.end_trial();
        assert!(cb.is_available(later));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_trial_slot_freed_by_outcome() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::new("w1");
        for _ in 0..3 {
            cb.record_failure(now, &config());
        }
        let later = now + Duration::from_secs(60);
        assert!(cb.is_available(later));
        assert!(cb.begin_trial());

        cb.record_success();
        assert!(!cb.trial_in_flight());
        assert!(cb.is_available(later));
        assert!(!cb.begin_trial());
    }
}
