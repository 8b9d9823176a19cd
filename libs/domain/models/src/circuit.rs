use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-service configuration for the adaptive circuit breaker (spec §3/§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitConfig {
    pub failure_rate_threshold: f64,
    pub slow_call_rate_threshold: f64,
    pub slow_call_threshold: Duration,
    pub minimum_requests: u32,
    pub sliding_window_size: usize,
    pub open_duration: Duration,
    pub half_open_max_duration: Duration,
    pub adaptive: bool,
    pub learning_rate: f64,
    /// Successes required in `HalfOpen` before closing the circuit again.
    pub success_threshold: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            slow_call_rate_threshold: 0.5,
            slow_call_threshold: Duration::from_secs(5),
            minimum_requests: 20,
            sliding_window_size: 20,
            open_duration: Duration::from_secs(30),
            half_open_max_duration: Duration::from_secs(30),
            adaptive: true,
            learning_rate: 0.1,
            success_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStateKind {
    Closed,
    Open,
    HalfOpen,
}

/// A single recorded call, kept in the bounded sliding window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    pub timestamp_millis: i64,
    pub success: bool,
    pub latency_ms: u64,
    pub error_class: Option<String>,
    pub status_code: Option<u16>,
}

/// Point-in-time metrics snapshot returned by `GetCircuitMetrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitMetrics {
    pub service_id: String,
    pub state: CircuitStateKind,
    pub total_calls: u64,
    pub failure_rate: f64,
    pub slow_call_rate: f64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
    pub avg_latency_ms: f64,
    pub health_score: f64,
    pub state_changed_at_millis: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub latency_anomaly: bool,
    pub failure_rate_anomaly: bool,
    pub baseline_avg_latency_ms: f64,
    pub baseline_stddev_latency_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub slope_ms_per_call: f64,
    pub confidence: f64,
}
