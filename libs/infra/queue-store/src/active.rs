use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

/// Per-submitter set of job ids currently in `pending` or `processing`,
/// mutated atomically at admission and at terminal transitions.
pub struct ActiveJobSet {
    by_submitter: Mutex<HashMap<String, HashSet<Uuid>>>,
}

impl ActiveJobSet {
    pub fn new() -> Self {
        Self { by_submitter: Mutex::new(HashMap::new()) }
    }

    pub fn add(&self, submitter_id: &str, job_id: Uuid) {
        let mut guard = self.by_submitter.lock().expect("active job set lock poisoned");
        guard.entry(submitter_id.to_string()).or_default().insert(job_id);
    }

    pub fn remove(&self, submitter_id: &str, job_id: Uuid) {
        let mut guard = self.by_submitter.lock().expect("active job set lock poisoned");
        if let Some(set) = guard.get_mut(submitter_id) {
            set.remove(&job_id);
            if set.is_empty() {
                guard.remove(submitter_id);
            }
        }
    }

    pub fn count_for(&self, submitter_id: &str) -> u32 {
        let guard = self.by_submitter.lock().expect("active job set lock poisoned");
        guard.get(submitter_id).map_or(0, |set| set.len() as u32)
    }

    pub fn active_submitter_count(&self) -> usize {
        let guard = self.by_submitter.lock().expect("active job set lock poisoned");
        guard.len()
    }
}

impl Default for ActiveJobSet {
    fn default() -> Self {
        Self::new()
    }
}
