use chrono::{DateTime, Duration, Utc};
use fingerprint::Fingerprint;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

struct DedupEntry {
    job_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// `(submitter_id, fingerprint) -> job_id` map with a short TTL, coalescing
/// accidental duplicate submissions from the same caller before the cache
/// entry exists.
pub struct DedupStore {
    entries: Mutex<HashMap<(String, Fingerprint), DedupEntry>>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    pub fn lookup(&self, submitter_id: &str, fingerprint: &Fingerprint, now: DateTime<Utc>) -> Option<Uuid> {
        let guard = self.entries.lock().expect("dedup store lock poisoned");
        guard
            .get(&(submitter_id.to_string(), *fingerprint))
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.job_id)
    }

    pub fn insert(&self, submitter_id: String, fingerprint: Fingerprint, job_id: Uuid, window_seconds: u64, now: DateTime<Utc>) {
        let mut guard = self.entries.lock().expect("dedup store lock poisoned");
        guard.insert((submitter_id, fingerprint), DedupEntry { job_id, expires_at: now + Duration::seconds(window_seconds as i64) });
    }

    pub fn remove(&self, submitter_id: &str, fingerprint: &Fingerprint) {
        let mut guard = self.entries.lock().expect("dedup store lock poisoned");
        guard.remove(&(submitter_id.to_string(), *fingerprint));
    }
}

impl Default for DedupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_none_after_window_expires() {
        let store = DedupStore::new();
        let fp = fingerprint::fingerprint_of(&"x").unwrap();
        let job_id = Uuid::new_v4();
        let now = Utc::now();
        store.insert("u1".into(), fp, job_id, 10, now);
        assert_eq!(store.lookup("u1", &fp, now), Some(job_id));
        assert_eq!(store.lookup("u1", &fp, now + Duration::seconds(11)), None);
    }
}
