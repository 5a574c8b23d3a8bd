use battle_models::QueueConfig;
use chrono::{DateTime, Duration, Utc};
use queue_store::{JobStore, StateCounts};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

const CACHE_TTL_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePressure {
    Normal,
    Warning,
    Critical,
}

/// The `{pending, processing, completed, failed, timestamp}` view exposed to
/// status/metrics callers. `timestamp` is when the underlying counts were
/// last refreshed from the job store, not the moment of the call.
#[derive(Debug, Clone, Copy)]
pub struct QueueSnapshot {
    pub pending: u32,
    pub processing: u32,
    pub completed: u32,
    pub failed: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy)]
struct CachedCounts {
    counts: StateCounts,
    refreshed_at: DateTime<Utc>,
}

/// Tracks queue-depth pressure behind a ~1s result cache, so a burst of
/// status/metrics calls doesn't each re-scan the job store. Fires its
/// `warn!` at most once per cache epoch per threshold crossing; the epoch
/// resets whenever the cache actually refreshes, not on every poll, so a
/// queue sitting above the warning line doesn't spam the log every tick.
pub struct QueueSizeMonitor {
    job_store: Arc<JobStore>,
    config: QueueConfig,
    ttl: Duration,
    cached: Mutex<Option<CachedCounts>>,
    warned: AtomicBool,
    critical: AtomicBool,
}

impl QueueSizeMonitor {
    pub fn new(job_store: Arc<JobStore>, config: QueueConfig) -> Self {
        Self::with_ttl(job_store, config, Duration::milliseconds(CACHE_TTL_MS))
    }

    fn with_ttl(job_store: Arc<JobStore>, config: QueueConfig, ttl: Duration) -> Self {
        Self { job_store, config, ttl, cached: Mutex::new(None), warned: AtomicBool::new(false), critical: AtomicBool::new(false) }
    }

    /// Returns the cached job-state counts, refreshing from the job store
    /// once the TTL has elapsed. A refresh starts a new epoch: the
    /// warning/critical one-shot flags are re-armed so this epoch's first
    /// crossing logs again.
    fn cached_counts(&self, now: DateTime<Utc>) -> CachedCounts {
        let mut guard = self.cached.lock().expect("queue monitor cache lock poisoned");
        let stale = match guard.as_ref() {
            Some(entry) => now - entry.refreshed_at >= self.ttl,
            None => true,
        };
        if stale {
            let entry = CachedCounts { counts: self.job_store.state_counts(), refreshed_at: now };
            *guard = Some(entry);
            self.warned.store(false, Ordering::Relaxed);
            self.critical.store(false, Ordering::Relaxed);
            return entry;
        }
        *guard.as_ref().expect("checked above")
    }

    /// The cached `{pending, processing, completed, failed, timestamp}`
    /// snapshot, amortizing backing-store queries across callers within the
    /// same ~1s epoch.
    pub fn snapshot(&self) -> QueueSnapshot {
        let cached = self.cached_counts(Utc::now());
        QueueSnapshot {
            pending: cached.counts.pending,
            processing: cached.counts.processing,
            completed: cached.counts.completed,
            failed: cached.counts.failed,
            timestamp: cached.refreshed_at,
        }
    }

    /// Checks the cached queue depth against the configured thresholds,
    /// logging (at most once per cache epoch per crossing) and returning the
    /// current pressure level.
    pub fn poll(&self) -> QueuePressure {
        let depth = self.cached_counts(Utc::now()).counts.queue_depth();

        if depth >= self.config.critical_threshold {
            if !self.critical.swap(true, Ordering::Relaxed) {
                warn!(depth, threshold = self.config.critical_threshold, "queue depth crossed critical threshold");
            }
            self.warned.store(true, Ordering::Relaxed);
            return QueuePressure::Critical;
        }

        if depth >= self.config.warning_threshold {
            if !self.warned.swap(true, Ordering::Relaxed) {
                warn!(depth, threshold = self.config.warning_threshold, "queue depth crossed warning threshold");
            }
            return QueuePressure::Warning;
        }

        QueuePressure::Normal
    }

    /// A rough ETA for a job entering the back of the current queue, used by
    /// status responses. Purely advisory: `avg_processing_time_ms` is a
    /// static config value, not a measured rolling average. Rounds the
    /// depth/worker ratio up, since a partially-full batch of workers still
    /// takes a full processing slot.
    pub fn estimated_wait_ms(&self) -> u64 {
        let depth = self.cached_counts(Utc::now()).counts.queue_depth() as u64;
        let workers = self.config.worker_concurrency.max(1) as u64;
        depth.div_ceil(workers) * self.config.avg_processing_time_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_models::{Dimensions, GenerationRequest, Job};
    use chrono::Utc;
    use fingerprint::fingerprint_of;

    fn config() -> QueueConfig {
        QueueConfig { worker_concurrency: 1, max_jobs_per_user: 5, system_queue_limit: 10, warning_threshold: 2, critical_threshold: 3, avg_processing_time_ms: 1000 }
    }

    fn job() -> Job {
        let request = GenerationRequest {
            request_type: "character".into(),
            style: "pixel-art".into(),
            dimensions: Dimensions { width: 32, height: 32 },
            description: "A brave knight".into(),
            action: None,
            reference_image: None,
            text_guidance_scale: None,
        };
        let fp = fingerprint_of(&request).unwrap();
        Job::new(uuid::Uuid::new_v4(), "u1".into(), fp, request, Utc::now())
    }

    #[test]
    fn pressure_escalates_and_resets_with_depth() {
        let store = Arc::new(JobStore::new());
        // Zero TTL disables caching so each poll observes the live depth.
        let monitor = QueueSizeMonitor::with_ttl(store.clone(), config(), Duration::zero());
        assert_eq!(monitor.poll(), QueuePressure::Normal);

        store.enqueue(job());
        store.enqueue(job());
        assert_eq!(monitor.poll(), QueuePressure::Warning);

        store.enqueue(job());
        assert_eq!(monitor.poll(), QueuePressure::Critical);
    }

    #[test]
    fn estimated_wait_rounds_up_partial_worker_batches() {
        let store = Arc::new(JobStore::new());
        let mut cfg = config();
        cfg.worker_concurrency = 4;
        for _ in 0..5 {
            store.enqueue(job());
        }
        let monitor = QueueSizeMonitor::with_ttl(store, cfg, Duration::zero());
        // depth=5, workers=4: a floor division would give 1x avg; five jobs
        // need two full worker rounds to drain.
        assert_eq!(monitor.estimated_wait_ms(), 2 * cfg.avg_processing_time_ms);
    }

    #[test]
    fn snapshot_reports_counts_by_state() {
        let store = Arc::new(JobStore::new());
        store.enqueue(job());
        let monitor = QueueSizeMonitor::with_ttl(store, config(), Duration::zero());
        let snap = monitor.snapshot();
        assert_eq!(snap.pending, 1);
        assert_eq!(snap.processing, 0);
        assert_eq!(snap.completed, 0);
        assert_eq!(snap.failed, 0);
    }

    #[test]
    fn cached_counts_hold_for_the_ttl_window() {
        let store = Arc::new(JobStore::new());
        let monitor = QueueSizeMonitor::with_ttl(store.clone(), config(), Duration::milliseconds(1000));
        let baseline = monitor.snapshot();
        assert_eq!(baseline.pending, 0);

        // Enqueued within the same epoch: the cached snapshot doesn't see it yet.
        store.enqueue(job());
        let still_cached = monitor.snapshot();
        assert_eq!(still_cached.pending, 0);
        assert_eq!(still_cached.timestamp, baseline.timestamp);
    }

    #[test]
    fn warning_logs_once_per_epoch() {
        let store = Arc::new(JobStore::new());
        store.enqueue(job());
        store.enqueue(job());
        let monitor = QueueSizeMonitor::with_ttl(store, config(), Duration::milliseconds(1000));

        assert_eq!(monitor.poll(), QueuePressure::Warning);
        assert!(monitor.warned.load(Ordering::Relaxed));
        // Repeated polls within the same cache epoch stay armed, they don't re-fire.
        assert_eq!(monitor.poll(), QueuePressure::Warning);
        assert!(monitor.warned.load(Ordering::Relaxed));
    }
}
