use crate::circuit::CircuitState;
use crate::learning::{blend_threshold, detect_anomaly_default, detect_trend, ThresholdLearner};
use chrono::{Datelike, Timelike, Utc};
use openpenpal_models::circuit::{AnomalyReport, CallResult, CircuitConfig, CircuitMetrics, TrendReport};
use openpenpal_models::error::CoreError;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, instrument, warn};

const DEFAULT_ADAPTATION_INTERVAL_SECS: u64 = 60;
const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;
const DEFAULT_METRICS_RETENTION_SECS: i64 = 60 * 60;
const FAILURE_RATE_MIN: f64 = 0.1;
const FAILURE_RATE_MAX: f64 = 0.9;
const SLOW_CALL_RATE_MIN: f64 = 0.1;
const SLOW_CALL_RATE_MAX: f64 = 0.8;

/// C3 entry point. One registry per process; holds every registered
/// service's circuit state plus its online learner, both keyed by
/// `serviceId`. A single pair of background tasks (not one per service)
/// drives adaptation and maintenance, bounding task count (spec §4.3).
pub struct CircuitBreakerRegistry {
    circuits: RwLock<HashMap<String, CircuitState>>,
    learners: RwLock<HashMap<String, ThresholdLearner>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self { circuits: RwLock::new(HashMap::new()), learners: RwLock::new(HashMap::new()) }
    }

    pub fn register(&self, service_id: &str, config: CircuitConfig, now_millis: i64) {
        let mut circuits = self.circuits.write().expect("circuit registry poisoned");
        circuits.entry(service_id.to_string()).or_insert_with(|| CircuitState::new(config, now_millis));
        if config_is_adaptive(&circuits, service_id) {
            self.learners.write().expect("learner registry poisoned").entry(service_id.to_string()).or_insert_with(ThresholdLearner::new);
        }
    }

    /// `IsCallAllowed` (spec §4.3). An unregistered service is allowed by
    /// default, with `NotFound` returned alongside for the caller to log.
    pub fn is_call_allowed(&self, service_id: &str, now_millis: i64) -> (bool, Option<CoreError>) {
        let mut circuits = self.circuits.write().expect("circuit registry poisoned");
        match circuits.get_mut(service_id) {
            Some(circuit) => (circuit.is_call_allowed(now_millis), None),
            None => (true, Some(CoreError::NotFound(format!("circuit for service {service_id}")))),
        }
    }

    /// `RecordCall` (spec §4.3). State mutation failures never propagate;
    /// an unregistered service is silently ignored bar a warning log.
    pub fn record_call(&self, service_id: &str, result: CallResult, now_millis: i64) {
        let mut circuits = self.circuits.write().expect("circuit registry poisoned");
        match circuits.get_mut(service_id) {
            Some(circuit) => circuit.record_call(result, now_millis),
            None => warn!(service_id, "record_call for unregistered circuit"),
        }
    }

    pub fn get_circuit_metrics(&self, service_id: &str, now_millis: i64) -> Option<CircuitMetrics> {
        let circuits = self.circuits.read().expect("circuit registry poisoned");
        circuits.get(service_id).map(|c| c.metrics(service_id, now_millis))
    }

    pub fn anomaly_report(&self, service_id: &str, now_millis: i64) -> Option<AnomalyReport> {
        let circuits = self.circuits.read().expect("circuit registry poisoned");
        circuits.get(service_id).map(|c| detect_anomaly_default(c.window(), now_millis))
    }

    pub fn trend_report(&self, service_id: &str) -> Option<TrendReport> {
        let circuits = self.circuits.read().expect("circuit registry poisoned");
        circuits.get(service_id).map(|c| detect_trend(c.window()))
    }

    /// Runs one adaptation pass: feeds each adaptive service's current
    /// window into its learner, predicts new thresholds, and blends them in
    /// (spec §4.3 steps 1-3). Exposed directly so tests can drive a pass
    /// without waiting on the ticker.
    #[instrument(skip(self))]
    pub fn run_adaptation_pass(&self, now_millis: i64) {
        let now = Utc::now();
        let hour = now.hour() as usize;
        let weekday = now.weekday().num_days_from_monday() as usize;

        let mut circuits = self.circuits.write().expect("circuit registry poisoned");
        let mut learners = self.learners.write().expect("learner registry poisoned");

        for (service_id, circuit) in circuits.iter_mut() {
            if !circuit.config.adaptive {
                continue;
            }
            let Some(learner) = learners.get_mut(service_id) else { continue };

            let avg_latency = circuit.window().avg_latency();
            let failure_rate = circuit.window().failure_rate();
            learner.observe(hour, weekday, avg_latency, failure_rate, circuit.config.learning_rate);

            let prediction = learner.predict(hour, weekday, circuit.config.slow_call_threshold.as_millis() as f64);
            if prediction.confidence <= 0.0 {
                continue;
            }

            let learning_rate = circuit.config.learning_rate;
            circuit.config.failure_rate_threshold = blend_threshold(
                circuit.config.failure_rate_threshold,
                prediction.failure_rate_threshold,
                learning_rate,
                FAILURE_RATE_MIN,
                FAILURE_RATE_MAX,
            );
            circuit.config.slow_call_rate_threshold = blend_threshold(
                circuit.config.slow_call_rate_threshold,
                prediction.slow_call_rate_threshold,
                learning_rate,
                SLOW_CALL_RATE_MIN,
                SLOW_CALL_RATE_MAX,
            );

            info!(
                service_id,
                failure_rate_threshold = circuit.config.failure_rate_threshold,
                slow_call_rate_threshold = circuit.config.slow_call_rate_threshold,
                confidence = prediction.confidence,
                "adapted circuit thresholds"
            );
        }
        let _ = now_millis;
    }

    pub fn run_maintenance_pass(&self, now_millis: i64, retention_millis: i64) {
        let mut circuits = self.circuits.write().expect("circuit registry poisoned");
        for circuit in circuits.values_mut() {
            circuit.prune(now_millis, retention_millis);
        }
    }

    /// Spawns the adaptation daemon (default every 60s). Grounded in the
    /// ticker/`MissedTickBehavior::Skip` pattern used for background
    /// maintenance across the rest of the stack.
    pub fn spawn_adaptation_daemon(self: std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(DEFAULT_ADAPTATION_INTERVAL_SECS));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let now_millis = chrono::Utc::now().timestamp_millis();
                self.run_adaptation_pass(now_millis);
            }
        })
    }

    pub fn spawn_maintenance_daemon(self: std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(DEFAULT_HEALTH_CHECK_INTERVAL_SECS));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let now_millis = chrono::Utc::now().timestamp_millis();
                self.run_maintenance_pass(now_millis, DEFAULT_METRICS_RETENTION_SECS * 1000);
            }
        })
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn config_is_adaptive(circuits: &HashMap<String, CircuitState>, service_id: &str) -> bool {
    circuits.get(service_id).map(|c| c.config.adaptive).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitConfig {
        CircuitConfig { minimum_requests: 5, sliding_window_size: 20, adaptive: true, ..Default::default() }
    }

    #[test]
    fn unregistered_service_allows_call_with_error() {
        let registry = CircuitBreakerRegistry::new();
        let (allowed, err) = registry.is_call_allowed("unknown", 0);
        assert!(allowed);
        assert!(matches!(err, Some(CoreError::NotFound(_))));
    }

    #[test]
    fn registered_service_tracks_metrics() {
        let registry = CircuitBreakerRegistry::new();
        registry.register("letters-api", config(), 0);
        for i in 0..5 {
            registry.record_call(
                "letters-api",
                CallResult { timestamp_millis: i, success: true, latency_ms: 10, error_class: None, status_code: None },
                i,
            );
        }
        let metrics = registry.get_circuit_metrics("letters-api", 5).unwrap();
        assert_eq!(metrics.total_calls, 5);
    }

    #[test]
    fn adaptation_pass_moves_thresholds_for_adaptive_services() {
        let registry = CircuitBreakerRegistry::new();
        registry.register("letters-api", config(), 0);
        for i in 0..30 {
            registry.record_call(
                "letters-api",
                CallResult { timestamp_millis: i, success: i % 3 != 0, latency_ms: 50, error_class: None, status_code: None },
                i,
            );
        }
        for _ in 0..5 {
            registry.run_adaptation_pass(30);
        }
        let metrics = registry.get_circuit_metrics("letters-api", 30).unwrap();
        assert!(metrics.failure_rate >= 0.0);
    }
}
