use crate::window::SlidingWindow;
use openpenpal_models::circuit::{AnomalyReport, TrendReport};

const FAILURE_WEIGHT: f64 = 0.35;
const HOUR_LATENCY_WEIGHT: f64 = 0.15;
const WEEKDAY_FAILURE_WEIGHT: f64 = 0.25;
const WEEKDAY_LATENCY_WEIGHT: f64 = 0.10;
const TIME_PHASE_WEIGHT: f64 = 0.15;

const DEFAULT_SENSITIVITY: f64 = 2.0;
const TREND_SAMPLE_CAP: usize = 100;

#[derive(Debug, Clone, Copy, Default)]
struct BucketStats {
    avg_latency_ms: f64,
    failure_rate: f64,
    sample_count: u64,
}

impl BucketStats {
    fn observe(&mut self, avg_latency_ms: f64, failure_rate: f64, learning_rate: f64) {
        if self.sample_count == 0 {
            self.avg_latency_ms = avg_latency_ms;
            self.failure_rate = failure_rate;
        } else {
            self.avg_latency_ms += learning_rate * (avg_latency_ms - self.avg_latency_ms);
            self.failure_rate += learning_rate * (failure_rate - self.failure_rate);
        }
        self.sample_count += 1;
    }
}

pub struct ThresholdPrediction {
    pub failure_rate_threshold: f64,
    pub slow_call_rate_threshold: f64,
    pub confidence: f64,
}

/// Online threshold learner (spec §4.3). One instance per adaptive service;
/// hourly/weekday buckets are updated every `adaptationInterval` from the
/// service's current sliding window, never from individual calls.
pub struct ThresholdLearner {
    hourly: [BucketStats; 24],
    weekday: [BucketStats; 7],
}

impl ThresholdLearner {
    pub fn new() -> Self {
        Self { hourly: [BucketStats::default(); 24], weekday: [BucketStats::default(); 7] }
    }

    pub fn observe(&mut self, hour: usize, weekday: usize, avg_latency_ms: f64, failure_rate: f64, learning_rate: f64) {
        self.hourly[hour % 24].observe(avg_latency_ms, failure_rate, learning_rate);
        self.weekday[weekday % 7].observe(avg_latency_ms, failure_rate, learning_rate);
    }

    /// Predicts the next threshold values via a linear weighted sum of
    /// normalized features: current hour's failure rate, normalized hourly
    /// latency, the weekday counterparts, and hour/weekday phase. Latency is
    /// normalized against `slow_call_threshold_ms` so the feature stays in
    /// roughly [0,1] even without a fixed scale.
    pub fn predict(&self, hour: usize, weekday: usize, slow_call_threshold_ms: f64) -> ThresholdPrediction {
        let hour_bucket = &self.hourly[hour % 24];
        let weekday_bucket = &self.weekday[weekday % 7];

        let hour_latency_norm = normalize_latency(hour_bucket.avg_latency_ms, slow_call_threshold_ms);
        let weekday_latency_norm = normalize_latency(weekday_bucket.avg_latency_ms, slow_call_threshold_ms);
        let time_phase = ((hour % 24) as f64 / 24.0 + (weekday % 7) as f64 / 7.0) / 2.0;

        let failure_rate_threshold = (FAILURE_WEIGHT * hour_bucket.failure_rate
            + HOUR_LATENCY_WEIGHT * hour_latency_norm
            + WEEKDAY_FAILURE_WEIGHT * weekday_bucket.failure_rate
            + WEEKDAY_LATENCY_WEIGHT * weekday_latency_norm
            + TIME_PHASE_WEIGHT * time_phase)
            .clamp(0.0, 1.0);

        let slow_call_rate_threshold = (hour_latency_norm * 0.6 + weekday_latency_norm * 0.4).clamp(0.0, 1.0);

        let sample_count = hour_bucket.sample_count.max(weekday_bucket.sample_count);
        let confidence = (sample_count as f64 / 100.0).min(1.0);

        ThresholdPrediction { failure_rate_threshold, slow_call_rate_threshold, confidence }
    }
}

impl Default for ThresholdLearner {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_latency(avg_latency_ms: f64, slow_call_threshold_ms: f64) -> f64 {
    if slow_call_threshold_ms <= 0.0 {
        return 0.0;
    }
    (avg_latency_ms / slow_call_threshold_ms).clamp(0.0, 1.0)
}

/// `threshold ← threshold + learningRate·(prediction − threshold)`, clamped
/// to the caller-supplied bounds (spec §4.3 step 3).
pub fn blend_threshold(current: f64, prediction: f64, learning_rate: f64, min: f64, max: f64) -> f64 {
    (current + learning_rate * (prediction - current)).clamp(min, max)
}

/// Compares the window's recent averages against a baseline mean/stddev
/// computed from the same window (spec §4.3 "Anomaly & trend detection").
pub fn detect_anomaly(window: &SlidingWindow, now_millis: i64, sensitivity: f64) -> AnomalyReport {
    let latencies: Vec<f64> = window.iter().map(|c| c.latency_ms as f64).collect();
    if latencies.len() < 2 {
        return AnomalyReport {
            latency_anomaly: false,
            failure_rate_anomaly: false,
            baseline_avg_latency_ms: 0.0,
            baseline_stddev_latency_ms: 0.0,
        };
    }

    let mean = latencies.iter().sum::<f64>() / latencies.len() as f64;
    let variance = latencies.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / latencies.len() as f64;
    let stddev = variance.sqrt();

    let recent_n = latencies.len().min(5);
    let recent_avg = latencies[latencies.len() - recent_n..].iter().sum::<f64>() / recent_n as f64;
    let latency_anomaly = recent_avg > mean + sensitivity * stddev;

    let overall_failure = window.failure_rate();
    let recent_failure = window.recent_failure_rate(now_millis, 5 * 60 * 1000);
    let n = window.total_calls().max(1) as f64;
    let failure_stddev = (overall_failure * (1.0 - overall_failure) / n).sqrt();
    let failure_rate_anomaly = recent_failure > overall_failure + sensitivity * failure_stddev;

    AnomalyReport {
        latency_anomaly,
        failure_rate_anomaly,
        baseline_avg_latency_ms: mean,
        baseline_stddev_latency_ms: stddev,
    }
}

pub fn detect_anomaly_default(window: &SlidingWindow, now_millis: i64) -> AnomalyReport {
    detect_anomaly(window, now_millis, DEFAULT_SENSITIVITY)
}

/// Slope of a simple linear regression of latency over call index, over the
/// last `TREND_SAMPLE_CAP` samples (spec §4.3).
pub fn detect_trend(window: &SlidingWindow) -> TrendReport {
    let samples: Vec<f64> = window.iter().map(|c| c.latency_ms as f64).collect();
    let n = samples.len().min(TREND_SAMPLE_CAP);
    if n < 2 {
        return TrendReport { slope_ms_per_call: 0.0, confidence: 0.0 };
    }
    let start = samples.len() - n;
    let ys = &samples[start..];

    let x_mean = (n as f64 - 1.0) / 2.0;
    let y_mean = ys.iter().sum::<f64>() / n as f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let x = i as f64;
        numerator += (x - x_mean) * (y - y_mean);
        denominator += (x - x_mean).powi(2);
    }

    let slope = if denominator.abs() > f64::EPSILON { numerator / denominator } else { 0.0 };
    let confidence = (n as f64 / TREND_SAMPLE_CAP as f64).min(1.0);

    TrendReport { slope_ms_per_call: slope, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpenpal_models::circuit::CallResult;

    fn call(success: bool, latency_ms: u64, ts: i64) -> CallResult {
        CallResult { timestamp_millis: ts, success, latency_ms, error_class: None, status_code: None }
    }

    #[test]
    fn learner_confidence_grows_with_sample_count() {
        let mut learner = ThresholdLearner::new();
        for i in 0..10 {
            learner.observe(9, 2, 100.0, 0.1, 0.1);
            let _ = i;
        }
        let prediction = learner.predict(9, 2, 5000.0);
        assert!((prediction.confidence - 0.10).abs() < 1e-9);
    }

    #[test]
    fn blend_moves_toward_prediction_and_respects_clamp() {
        let blended = blend_threshold(0.5, 0.9, 0.1, 0.1, 0.9);
        assert!(blended > 0.5 && blended < 0.9);
        let clamped = blend_threshold(0.89, 5.0, 1.0, 0.1, 0.9);
        assert_eq!(clamped, 0.9);
    }

    #[test]
    fn anomaly_detected_on_latency_spike() {
        let mut window = SlidingWindow::new(50);
        for i in 0..20 {
            window.push(call(true, 10, i));
        }
        for i in 20..25 {
            window.push(call(true, 500, i));
        }
        let report = detect_anomaly_default(&window, 25);
        assert!(report.latency_anomaly);
    }

    #[test]
    fn trend_slope_is_positive_for_increasing_latency() {
        let mut window = SlidingWindow::new(50);
        for i in 0..20 {
            window.push(call(true, 10 + i as u64, i));
        }
        let trend = detect_trend(&window);
        assert!(trend.slope_ms_per_call > 0.0);
    }
}
