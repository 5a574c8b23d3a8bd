use std::collections::VecDeque;
use std::sync::Mutex;

const MAX_SAMPLES: usize = 1000;

/// A circular buffer of the most recent `MAX_SAMPLES` millisecond durations,
/// guarded by a short-lived lock during insert and snapshot read. Negative
/// samples (clock skew) are discarded, never clamped to zero.
pub struct Distribution {
    samples: Mutex<VecDeque<i64>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DistributionSummary {
    pub count: usize,
    pub mean: f64,
    pub min: i64,
    pub max: i64,
    pub p95: i64,
}

impl Distribution {
    pub fn new() -> Self {
        Self { samples: Mutex::new(VecDeque::with_capacity(MAX_SAMPLES)) }
    }

    pub fn record(&self, sample_ms: i64) {
        if sample_ms < 0 {
            return;
        }
        let mut guard = self.samples.lock().expect("distribution lock poisoned");
        if guard.len() == MAX_SAMPLES {
            guard.pop_front();
        }
        guard.push_back(sample_ms);
    }

    pub fn summary(&self) -> DistributionSummary {
        let guard = self.samples.lock().expect("distribution lock poisoned");
        if guard.is_empty() {
            return DistributionSummary::default();
        }
        let mut sorted: Vec<i64> = guard.iter().copied().collect();
        sorted.sort_unstable();
        let count = sorted.len();
        let sum: i64 = sorted.iter().sum();
        let mean = sum as f64 / count as f64;
        let min = sorted[0];
        let max = sorted[count - 1];
        let p95_index = ((count as f64) * 0.95).ceil() as usize;
        let p95 = sorted[p95_index.saturating_sub(1).min(count - 1)];
        DistributionSummary { count, mean, min, max, p95 }
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_samples_are_discarded_not_clamped() {
        let dist = Distribution::new();
        dist.record(-5);
        dist.record(10);
        let summary = dist.summary();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.min, 10);
    }

    #[test]
    fn caps_at_max_samples() {
        let dist = Distribution::new();
        for i in 0..(MAX_SAMPLES + 10) {
            dist.record(i as i64);
        }
        assert_eq!(dist.summary().count, MAX_SAMPLES);
    }
}
