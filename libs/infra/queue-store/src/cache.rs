use battle_models::GenerationResult;
use chrono::{DateTime, Duration, Utc};
use fingerprint::Fingerprint;
use std::collections::HashMap;
use std::sync::RwLock;

struct CacheEntry {
    result: GenerationResult,
    expires_at: DateTime<Utc>,
}

/// `fingerprint -> result` map with day-granularity TTL. Reads are lock-free
/// in spirit (a short read-lock, no I/O); writes are single-producer per
/// fingerprint because callers only ever write after winning the dedup race.
pub struct CacheStore {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    pub fn get(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> Option<GenerationResult> {
        let guard = self.entries.read().expect("cache store lock poisoned");
        guard.get(fingerprint).and_then(|entry| {
            if entry.expires_at > now {
                Some(entry.result.clone())
            } else {
                None
            }
        })
    }

    pub fn put(&self, fingerprint: Fingerprint, result: GenerationResult, ttl_days: u32, now: DateTime<Utc>) {
        let mut guard = self.entries.write().expect("cache store lock poisoned");
        guard.insert(fingerprint, CacheEntry { result, expires_at: now + Duration::days(ttl_days as i64) });
    }

    /// Lazily drops expired entries; called opportunistically, not on a
    /// timer, since a stale entry is harmless until the next read anyway.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut guard = self.entries.write().expect("cache store lock poisoned");
        let before = guard.len();
        guard.retain(|_, entry| entry.expires_at > now);
        before - guard.len()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_models::{CombatAttributes, GenerationResult, SpriteAsset};

    fn sample_result() -> GenerationResult {
        GenerationResult {
            base_sprite: SpriteAsset { data: vec![1, 2, 3], format: "png".into() },
            attributes: CombatAttributes { damage: 10, armor: 2, range: 3, speed: 4, attacks_per_second: 1.0 },
            directional_frames: vec![],
        }
    }

    #[test]
    fn entry_expires_after_ttl() {
        let store = CacheStore::new();
        let fp = fingerprint::fingerprint_of(&"x").unwrap();
        let now = Utc::now();
        store.put(fp, sample_result(), 1, now);
        assert!(store.get(&fp, now).is_some());
        assert!(store.get(&fp, now + Duration::days(2)).is_none());
    }
}
