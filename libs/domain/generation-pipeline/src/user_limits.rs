use chrono::{DateTime, Duration, Utc};
use queue_store::JobStore;
use std::collections::HashMap;
use std::sync::Mutex;

const DEFAULT_TTL_SECONDS: i64 = 5;

struct CachedCount {
    count: u32,
    expires_at: DateTime<Utc>,
}

/// A short-TTL cache in front of the authoritative
/// pending+processing count, so admission doesn't scan the job store on
/// every submission. An explicit `invalidate` call is made whenever a job
/// of that submitter reaches a terminal state, so freed slots are usable
/// immediately rather than waiting out the TTL.
pub struct UserLimitsCache {
    cached: Mutex<HashMap<String, CachedCount>>,
    ttl: Duration,
}

impl UserLimitsCache {
    pub fn new() -> Self {
        Self { cached: Mutex::new(HashMap::new()), ttl: Duration::seconds(DEFAULT_TTL_SECONDS) }
    }

    /// Returns the submitter's current active-job count, querying the job
    /// store on a cache miss. The job store here cannot itself fail (it is
    /// in-process), but the API is shaped so a real backing-store failure
    /// would propagate and the caller could fail closed.
    pub fn active_count(&self, submitter_id: &str, job_store: &JobStore, now: DateTime<Utc>) -> u32 {
        {
            let guard = self.cached.lock().expect("user limits cache lock poisoned");
            if let Some(entry) = guard.get(submitter_id) {
                if entry.expires_at > now {
                    return entry.count;
                }
            }
        }
        let count = job_store.count_active_for_submitter(submitter_id);
        let mut guard = self.cached.lock().expect("user limits cache lock poisoned");
        guard.insert(submitter_id.to_string(), CachedCount { count, expires_at: now + self.ttl });
        count
    }

    pub fn invalidate(&self, submitter_id: &str) {
        self.cached.lock().expect("user limits cache lock poisoned").remove(submitter_id);
    }
}

impl Default for UserLimitsCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_models::{GenerationRequest, Dimensions, Job};
    use fingerprint::fingerprint_of;
    use uuid::Uuid;

    fn sample_job(submitter: &str) -> Job {
        let request = GenerationRequest {
            request_type: "character".into(),
            style: "pixel-art".into(),
            dimensions: Dimensions { width: 32, height: 32 },
            description: "A brave knight".into(),
            action: Some("idle".into()),
            reference_image: None,
            text_guidance_scale: None,
        };
        let fp = fingerprint_of(&request).unwrap();
        Job::new(Uuid::new_v4(), submitter.to_string(), fp, request, Utc::now())
    }

    #[test]
    fn invalidate_forces_a_fresh_query() {
        let store = JobStore::new();
        store.enqueue(sample_job("u1"));
        let cache = UserLimitsCache::new();
        let now = Utc::now();
        assert_eq!(cache.active_count("u1", &store, now), 1);

        store.enqueue(sample_job("u1"));
        // Cached value still reflects the stale count until invalidated.
        assert_eq!(cache.active_count("u1", &store, now), 1);

        cache.invalidate("u1");
        assert_eq!(cache.active_count("u1", &store, now), 2);
    }
}
