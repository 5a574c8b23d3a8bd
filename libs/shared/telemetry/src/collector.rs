use crate::distribution::{Distribution, DistributionSummary};
use battle_models::JobState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

struct TrackedJob {
    submitter_id: String,
    state: JobState,
}

/// In-process metrics collector. Gauges reflect the collector's own view of job
/// state (kept in step with the pipeline via the `record_*` calls below),
/// independent of whatever the queue store's job records say — the two are
/// expected to agree, but the collector does not read the store directly.
pub struct MetricsCollector {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    jobs: Mutex<HashMap<Uuid, TrackedJob>>,
    job_duration_ms: Distribution,
    queue_wait_ms: Distribution,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StateGauges {
    pub pending: u32,
    pub processing: u32,
    pub completed: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub states: StateGauges,
    pub active_submitters: u32,
    pub job_duration_ms: DistributionSummary,
    pub queue_wait_ms: DistributionSummary,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            jobs: Mutex::new(HashMap::new()),
            job_duration_ms: Distribution::new(),
            queue_wait_ms: Distribution::new(),
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A new `job_id` enters the collector's view, in `pending`.
    pub fn record_submitted(&self, job_id: Uuid, submitter_id: String) {
        let mut guard = self.jobs.lock().expect("metrics collector lock poisoned");
        guard.insert(job_id, TrackedJob { submitter_id, state: JobState::Pending });
    }

    /// Moves the job into `processing`, recording `started_at - submitted_at`.
    pub fn record_start(&self, job_id: Uuid, wait_ms: i64) {
        self.queue_wait_ms.record(wait_ms);
        let mut guard = self.jobs.lock().expect("metrics collector lock poisoned");
        if let Some(job) = guard.get_mut(&job_id) {
            job.state = JobState::Processing;
        }
    }

    /// Moves the job into `completed`, recording `completed_at - started_at`.
    pub fn record_complete(&self, job_id: Uuid, duration_ms: i64) {
        self.job_duration_ms.record(duration_ms);
        let mut guard = self.jobs.lock().expect("metrics collector lock poisoned");
        if let Some(job) = guard.get_mut(&job_id) {
            job.state = JobState::Completed;
        }
    }

    pub fn record_failed(&self, job_id: Uuid) {
        let mut guard = self.jobs.lock().expect("metrics collector lock poisoned");
        if let Some(job) = guard.get_mut(&job_id) {
            job.state = JobState::Failed;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let guard = self.jobs.lock().expect("metrics collector lock poisoned");
        let mut states = StateGauges::default();
        let mut active_submitters = std::collections::HashSet::new();
        for job in guard.values() {
            match job.state {
                JobState::Pending => {
                    states.pending += 1;
                    active_submitters.insert(job.submitter_id.clone());
                }
                JobState::Processing | JobState::Retrying => {
                    states.processing += 1;
                    active_submitters.insert(job.submitter_id.clone());
                }
                JobState::Completed => states.completed += 1,
                JobState::Failed => states.failed += 1,
            }
        }
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            states,
            active_submitters: active_submitters.len() as u32,
            job_duration_ms: self.job_duration_ms.summary(),
            queue_wait_ms: self.queue_wait_ms.summary(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hit_rate_reflected_in_snapshot() {
        let collector = MetricsCollector::new();
        collector.record_cache_hit();
        collector.record_cache_hit();
        collector.record_cache_miss();
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.cache_hits, 2);
        assert_eq!(snapshot.cache_misses, 1);
    }

    #[test]
    fn active_submitters_counts_distinct_pending_or_processing() {
        let collector = MetricsCollector::new();
        let j1 = Uuid::new_v4();
        let j2 = Uuid::new_v4();
        collector.record_submitted(j1, "u1".into());
        collector.record_submitted(j2, "u1".into());
        assert_eq!(collector.snapshot().active_submitters, 1);
    }
}
