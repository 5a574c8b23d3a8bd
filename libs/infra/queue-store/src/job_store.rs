use battle_models::{Job, JobState};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

/// Counts of jobs by state, as exposed to the Queue Size Monitor and the
/// Metrics Collector.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateCounts {
    pub pending: u32,
    pub processing: u32,
    pub retrying: u32,
    pub completed: u32,
    pub failed: u32,
}

impl StateCounts {
    /// Pending + processing + delayed (retrying) — the admission-relevant queue depth.
    pub fn queue_depth(&self) -> u32 {
        self.pending + self.processing + self.retrying
    }
}

/// The canonical job record store plus the FIFO admission order. Stands in
/// for a durable work queue; a real deployment would back this with
/// Redis/SQS/etc. without changing the `JobStore` API.
pub struct JobStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
    pending_order: Mutex<VecDeque<Uuid>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self { jobs: Mutex::new(HashMap::new()), pending_order: Mutex::new(VecDeque::new()) }
    }

    /// Admits a freshly minted job into the FIFO queue.
    pub fn enqueue(&self, job: Job) {
        let job_id = job.job_id;
        self.jobs.lock().expect("job store lock poisoned").insert(job_id, job);
        self.pending_order.lock().expect("pending order lock poisoned").push_back(job_id);
    }

    /// Pops the next pending job id in admission order, if any.
    pub fn pull_next_pending(&self) -> Option<Uuid> {
        self.pending_order.lock().expect("pending order lock poisoned").pop_front()
    }

    pub fn get(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.lock().expect("job store lock poisoned").get(&job_id).cloned()
    }

    pub fn update<F: FnOnce(&mut Job)>(&self, job_id: Uuid, f: F) {
        if let Some(job) = self.jobs.lock().expect("job store lock poisoned").get_mut(&job_id) {
            f(job);
        }
    }

    pub fn state_counts(&self) -> StateCounts {
        let guard = self.jobs.lock().expect("job store lock poisoned");
        let mut counts = StateCounts::default();
        for job in guard.values() {
            match job.state {
                JobState::Pending => counts.pending += 1,
                JobState::Processing => counts.processing += 1,
                JobState::Retrying => counts.retrying += 1,
                JobState::Completed => counts.completed += 1,
                JobState::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Authoritative count of a submitter's jobs in `{pending, processing}`,
    /// used by the User Limits cache on a miss.
    pub fn count_active_for_submitter(&self, submitter_id: &str) -> u32 {
        let guard = self.jobs.lock().expect("job store lock poisoned");
        guard
            .values()
            .filter(|job| job.submitter_id == submitter_id && matches!(job.state, JobState::Pending | JobState::Processing | JobState::Retrying))
            .count() as u32
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
