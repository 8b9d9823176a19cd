use openpenpal_models::circuit::CallResult;
use std::collections::VecDeque;

/// Bounded FIFO of recent call outcomes (spec §4.3). Percentiles are
/// computed by sorting a copy of the window on demand — bounded size keeps
/// this constant-bounded work.
pub struct SlidingWindow {
    capacity: usize,
    calls: VecDeque<CallResult>,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), calls: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, result: CallResult) {
        if self.calls.len() >= self.capacity {
            self.calls.pop_front();
        }
        self.calls.push_back(result);
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn prune_older_than(&mut self, cutoff_millis: i64) {
        while let Some(front) = self.calls.front() {
            if front.timestamp_millis < cutoff_millis {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn failure_rate(&self) -> f64 {
        ratio(self.calls.iter().filter(|c| !c.success).count(), self.calls.len())
    }

    pub fn slow_call_rate(&self, slow_threshold_ms: u64) -> f64 {
        ratio(
            self.calls.iter().filter(|c| c.latency_ms >= slow_threshold_ms).count(),
            self.calls.len(),
        )
    }

    /// Failure rate restricted to calls within the last `window_millis` of `now`,
    /// used by the health-score's 70%-weighted recent component (spec §4.3).
    pub fn recent_failure_rate(&self, now_millis: i64, window_millis: i64) -> f64 {
        let cutoff = now_millis - window_millis;
        let recent: Vec<&CallResult> = self.calls.iter().filter(|c| c.timestamp_millis >= cutoff).collect();
        if recent.is_empty() {
            return self.failure_rate();
        }
        ratio(recent.iter().filter(|c| !c.success).count(), recent.len())
    }

    pub fn percentile_latency(&self, p: f64) -> u64 {
        if self.calls.is_empty() {
            return 0;
        }
        let mut latencies: Vec<u64> = self.calls.iter().map(|c| c.latency_ms).collect();
        latencies.sort_unstable();
        let idx = ((latencies.len() as f64 - 1.0) * p).round() as usize;
        latencies[idx.min(latencies.len() - 1)]
    }

    pub fn avg_latency(&self) -> f64 {
        if self.calls.is_empty() {
            return 0.0;
        }
        self.calls.iter().map(|c| c.latency_ms as f64).sum::<f64>() / self.calls.len() as f64
    }

    pub fn total_calls(&self) -> u64 {
        self.calls.len() as u64
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallResult> {
        self.calls.iter()
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(success: bool, latency_ms: u64, ts: i64) -> CallResult {
        CallResult { timestamp_millis: ts, success, latency_ms, error_class: None, status_code: None }
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut window = SlidingWindow::new(2);
        window.push(call(true, 1, 1));
        window.push(call(true, 2, 2));
        window.push(call(true, 3, 3));
        assert_eq!(window.len(), 2);
        assert_eq!(window.iter().next().unwrap().timestamp_millis, 2);
    }

    #[test]
    fn failure_rate_counts_correctly() {
        let mut window = SlidingWindow::new(10);
        window.push(call(true, 1, 1));
        window.push(call(false, 1, 2));
        assert_eq!(window.failure_rate(), 0.5);
    }

    #[test]
    fn percentile_is_stable_for_sorted_latencies() {
        let mut window = SlidingWindow::new(10);
        for i in 1..=10u64 {
            window.push(call(true, i * 10, i as i64));
        }
        assert_eq!(window.percentile_latency(0.95), 100);
    }
}
