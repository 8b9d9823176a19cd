use crate::window::SlidingWindow;
use openpenpal_models::circuit::{CallResult, CircuitConfig, CircuitMetrics, CircuitStateKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

const RECENT_WINDOW_MILLIS: i64 = 5 * 60 * 1000;
const RECENT_WEIGHT: f64 = 0.7;

/// Per-service circuit state (spec §4.3/§8 invariant 4). Mutated only under
/// the registry's per-service write lock; `now_millis` is always passed in
/// rather than read from the wall clock so transitions are deterministic
/// and testable.
pub struct CircuitState {
    pub config: CircuitConfig,
    state: CircuitStateKind,
    window: SlidingWindow,
    state_changed_at_millis: i64,
    half_open_successes: u32,
    half_open_probe_in_flight: AtomicUsize,
}

impl CircuitState {
    pub fn new(config: CircuitConfig, now_millis: i64) -> Self {
        let window_size = config.sliding_window_size;
        Self {
            config,
            state: CircuitStateKind::Closed,
            window: SlidingWindow::new(window_size),
            state_changed_at_millis: now_millis,
            half_open_successes: 0,
            half_open_probe_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> CircuitStateKind {
        self.state
    }

    /// `IsCallAllowed` (spec §4.3). Pull-based Open → HalfOpen transition:
    /// evaluated here, not on a separate ticker.
    pub fn is_call_allowed(&mut self, now_millis: i64) -> bool {
        match self.state {
            CircuitStateKind::Closed => true,
            CircuitStateKind::Open => {
                if now_millis - self.state_changed_at_millis >= self.config.open_duration.as_millis() as i64 {
                    self.transition_to(CircuitStateKind::HalfOpen, now_millis);
                    // This call is itself the first probe; claim the slot so a
                    // concurrent caller's compare_exchange(0, 1) below loses.
                    self.half_open_probe_in_flight.store(1, Ordering::SeqCst);
                    true
                } else {
                    false
                }
            }
            CircuitStateKind::HalfOpen => {
                // Fixed concurrent-probe limit of 1 (redesign-flag decision,
                // spec §9(a): the source's implicit limit is made explicit here).
                self.half_open_probe_in_flight
                    .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            }
        }
    }

    /// `RecordCall` (spec §4.3).
    pub fn record_call(&mut self, result: CallResult, now_millis: i64) {
        if self.state == CircuitStateKind::HalfOpen {
            self.half_open_probe_in_flight.store(0, Ordering::SeqCst);
        }

        let success = result.success;
        self.window.push(result);

        match self.state {
            CircuitStateKind::HalfOpen => {
                if success {
                    self.half_open_successes += 1;
                    if self.half_open_successes >= self.config.success_threshold {
                        self.transition_to(CircuitStateKind::Closed, now_millis);
                    }
                } else if self.breach(now_millis) {
                    self.transition_to(CircuitStateKind::Open, now_millis);
                }
            }
            CircuitStateKind::Closed => {
                if self.window.total_calls() >= self.config.minimum_requests as u64 && self.breach(now_millis) {
                    self.transition_to(CircuitStateKind::Open, now_millis);
                }
            }
            CircuitStateKind::Open => {}
        }
    }

    fn breach(&self, now_millis: i64) -> bool {
        let failure_rate = self.window.failure_rate();
        let slow_rate = self.window.slow_call_rate(self.config.slow_call_threshold.as_millis() as u64);
        let health = self.health_score(now_millis);

        failure_rate >= self.config.failure_rate_threshold
            || slow_rate >= self.config.slow_call_rate_threshold
            || health < 0.3
    }

    /// `0.6·(1-failureRate) + 0.4·(1-slowCallRate)`, with the failure term
    /// re-weighted 70% toward the last 5 minutes (spec §4.3).
    pub fn health_score(&self, now_millis: i64) -> f64 {
        let overall_failure = self.window.failure_rate();
        let recent_failure = self.window.recent_failure_rate(now_millis, RECENT_WINDOW_MILLIS);
        let blended_failure = RECENT_WEIGHT * recent_failure + (1.0 - RECENT_WEIGHT) * overall_failure;
        let slow_rate = self.window.slow_call_rate(self.config.slow_call_threshold.as_millis() as u64);

        (0.6 * (1.0 - blended_failure) + 0.4 * (1.0 - slow_rate)).clamp(0.0, 1.0)
    }

    pub fn prune(&mut self, now_millis: i64, retention_millis: i64) {
        self.window.prune_older_than(now_millis - retention_millis);
    }

    fn transition_to(&mut self, new_state: CircuitStateKind, now_millis: i64) {
        if new_state != self.state {
            info!(from = ?self.state, to = ?new_state, "circuit state transition");
        }
        self.state = new_state;
        self.state_changed_at_millis = now_millis;
        if new_state == CircuitStateKind::HalfOpen {
            self.half_open_successes = 0;
        }
    }

    pub fn metrics(&self, service_id: &str, now_millis: i64) -> CircuitMetrics {
        CircuitMetrics {
            service_id: service_id.to_string(),
            state: self.state,
            total_calls: self.window.total_calls(),
            failure_rate: self.window.failure_rate(),
            slow_call_rate: self.window.slow_call_rate(self.config.slow_call_threshold.as_millis() as u64),
            p95_latency_ms: self.window.percentile_latency(0.95),
            p99_latency_ms: self.window.percentile_latency(0.99),
            avg_latency_ms: self.window.avg_latency(),
            health_score: self.health_score(now_millis),
            state_changed_at_millis: self.state_changed_at_millis,
        }
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn state_changed_at_millis(&self) -> i64 {
        self.state_changed_at_millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> CircuitConfig {
        CircuitConfig {
            minimum_requests: 10,
            sliding_window_size: 20,
            open_duration: Duration::from_secs(30),
            success_threshold: 5,
            ..Default::default()
        }
    }

    fn call(success: bool, ts: i64) -> CallResult {
        CallResult { timestamp_millis: ts, success, latency_ms: 10, error_class: None, status_code: None }
    }

    #[test]
    fn opens_after_failure_burst_above_minimum() {
        let mut circuit = CircuitState::new(config(), 0);
        for i in 0..6 {
            circuit.record_call(call(true, i), i);
        }
        for i in 6..12 {
            circuit.record_call(call(false, i), i);
        }
        assert_eq!(circuit.state(), CircuitStateKind::Open);
    }

    #[test]
    fn stays_closed_below_minimum_requests() {
        let mut circuit = CircuitState::new(config(), 0);
        for i in 0..5 {
            circuit.record_call(call(false, i), i);
        }
        assert_eq!(circuit.state(), CircuitStateKind::Closed);
    }

    #[test]
    fn open_denies_calls_until_open_duration_elapses() {
        let mut circuit = CircuitState::new(config(), 0);
        for i in 0..12 {
            circuit.record_call(call(false, i), i);
        }
        assert_eq!(circuit.state(), CircuitStateKind::Open);
        assert!(!circuit.is_call_allowed(5_000));
        assert!(circuit.is_call_allowed(30_001));
        assert_eq!(circuit.state(), CircuitStateKind::HalfOpen);
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let mut circuit = CircuitState::new(config(), 0);
        for i in 0..12 {
            circuit.record_call(call(false, i), i);
        }
        circuit.is_call_allowed(30_001);
        for i in 0..5 {
            circuit.record_call(call(true, 30_001 + i), 30_001 + i);
        }
        assert_eq!(circuit.state(), CircuitStateKind::Closed);
    }

    #[test]
    fn half_open_limits_to_one_concurrent_probe() {
        let mut circuit = CircuitState::new(config(), 0);
        for i in 0..12 {
            circuit.record_call(call(false, i), i);
        }
        circuit.is_call_allowed(30_001);
        assert!(circuit.is_call_allowed(30_002));
        assert!(!circuit.is_call_allowed(30_003));
    }
}
