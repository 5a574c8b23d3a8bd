use crate::queue_monitor::QueueSizeMonitor;
use crate::user_limits::UserLimitsCache;
use battle_models::{AdmissionError, BattleConfig, GenerationRequest, Job};
use battle_telemetry::MetricsCollector;
use chrono::Utc;
use fingerprint::fingerprint_of;
use queue_store::{ActiveJobSet, CacheStore, DedupStore, JobStore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// An identical request has already completed within the cache TTL; the
    /// prior result is handed back and no job is enqueued. `job_id` is a
    /// freshly minted identifier for this response only — no job record
    /// exists for it — ids are minted before the cache check runs.
    CacheHit { job_id: Uuid, result: battle_models::GenerationResult },
    /// An identical request from the same submitter is already in flight
    /// within the dedup window; the caller is pointed at that job instead
    /// of minting a new one.
    Deduplicated { job_id: Uuid },
    /// A fresh job was admitted and enqueued.
    Admitted { job_id: Uuid, estimated_wait_ms: u64, warning: Option<String> },
}

/// The sole entry point that can place a job into the queue. Owns the
/// admission algorithm end to end: validate, mint ids, cache lookup, dedup
/// lookup, user admission, system admission, enqueue.
pub struct JobSubmitter {
    job_store: Arc<JobStore>,
    cache_store: Arc<CacheStore>,
    dedup_store: Arc<DedupStore>,
    active_jobs: Arc<ActiveJobSet>,
    user_limits: Arc<UserLimitsCache>,
    metrics: Arc<MetricsCollector>,
    queue_monitor: Arc<QueueSizeMonitor>,
    config: BattleConfig,
}

impl JobSubmitter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_store: Arc<JobStore>,
        cache_store: Arc<CacheStore>,
        dedup_store: Arc<DedupStore>,
        active_jobs: Arc<ActiveJobSet>,
        user_limits: Arc<UserLimitsCache>,
        metrics: Arc<MetricsCollector>,
        queue_monitor: Arc<QueueSizeMonitor>,
        config: BattleConfig,
    ) -> Self {
        Self { job_store, cache_store, dedup_store, active_jobs, user_limits, metrics, queue_monitor, config }
    }

    #[instrument(skip(self, request), fields(submitter_id = %submitter_id))]
    pub fn submit(&self, submitter_id: &str, request: GenerationRequest) -> Result<SubmissionOutcome, AdmissionError> {
        if submitter_id.trim().is_empty() {
            return Err(AdmissionError::InvalidRequest("submitter_id must not be empty".into()));
        }
        request.validate().map_err(AdmissionError::InvalidRequest)?;

        let now = Utc::now();
        let fp = fingerprint_of(&request).map_err(|e| AdmissionError::InvalidRequest(e.to_string()))?;
        // Ids are minted before any of the lookups below run.
        let job_id = Uuid::new_v4();

        if let Some(result) = self.cache_store.get(&fp, now) {
            self.metrics.record_cache_hit();
            debug!("admission served from cache");
            return Ok(SubmissionOutcome::CacheHit { job_id, result });
        }
        self.metrics.record_cache_miss();

        if let Some(existing_job_id) = self.dedup_store.lookup(submitter_id, &fp, now) {
            debug!(job_id = %existing_job_id, "admission deduplicated against an in-flight job");
            return Ok(SubmissionOutcome::Deduplicated { job_id: existing_job_id });
        }

        let current = self.user_limits.active_count(submitter_id, &self.job_store, now);
        let max = self.config.queue.max_jobs_per_user;
        if current >= max {
            warn!(current, max, "admission rejected: user limit exceeded");
            return Err(AdmissionError::UserLimitExceeded { current, max });
        }

        let depth = self.job_store.state_counts().queue_depth();
        if depth >= self.config.queue.system_queue_limit {
            warn!(depth, limit = self.config.queue.system_queue_limit, "admission rejected: system queue full");
            return Err(AdmissionError::SystemQueueFull);
        }

        let job = Job::new(job_id, submitter_id.to_string(), fp, request, now);

        self.job_store.enqueue(job);
        self.active_jobs.add(submitter_id, job_id);
        self.dedup_store.insert(submitter_id.to_string(), fp, job_id, self.config.dedup.window_seconds, now);
        self.user_limits.invalidate(submitter_id);
        self.metrics.record_submitted(job_id, submitter_id.to_string());

        let warning = if depth + 1 >= self.config.queue.warning_threshold {
            Some(format!("queue depth {} is at or above the warning threshold", depth + 1))
        } else {
            None
        };

        info!(job_id = %job_id, "job admitted");
        Ok(SubmissionOutcome::Admitted { job_id, estimated_wait_ms: self.queue_monitor.estimated_wait_ms(), warning })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue_monitor::QueueSizeMonitor;
    use battle_models::Dimensions;

    fn config() -> BattleConfig {
        let mut cfg = BattleConfig::default();
        cfg.queue.max_jobs_per_user = 2;
        cfg.queue.system_queue_limit = 5;
        cfg.queue.warning_threshold = 10;
        cfg
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            request_type: "character".into(),
            style: "pixel-art".into(),
            dimensions: Dimensions { width: 32, height: 32 },
            description: "A brave knight".into(),
            action: Some("idle".into()),
            reference_image: None,
            text_guidance_scale: None,
        }
    }

    fn submitter() -> JobSubmitter {
        let job_store = Arc::new(JobStore::new());
        let config = config();
        JobSubmitter::new(
            job_store.clone(),
            Arc::new(CacheStore::new()),
            Arc::new(DedupStore::new()),
            Arc::new(ActiveJobSet::new()),
            Arc::new(UserLimitsCache::new()),
            Arc::new(MetricsCollector::new()),
            Arc::new(QueueSizeMonitor::new(job_store, config.queue)),
            config,
        )
    }

    #[test]
    fn duplicate_submission_within_the_window_returns_the_same_job_id() {
        let submitter = submitter();
        let first = submitter.submit("u1", request()).unwrap();
        let SubmissionOutcome::Admitted { job_id: first_id, .. } = first else { panic!("expected admission") };

        let second = submitter.submit("u1", request()).unwrap();
        let SubmissionOutcome::Deduplicated { job_id: second_id } = second else { panic!("expected dedup") };
        assert_eq!(first_id, second_id);
    }

    #[test]
    fn sixth_submission_at_the_user_limit_is_rejected() {
        let submitter = submitter();
        for i in 0..2 {
            let mut r = request();
            r.description = format!("request {i}");
            submitter.submit("u1", r).unwrap();
        }
        let mut over_limit = request();
        over_limit.description = "one too many".into();
        let err = submitter.submit("u1", over_limit).unwrap_err();
        assert!(matches!(err, AdmissionError::UserLimitExceeded { current: 2, max: 2 }));
    }

    #[test]
    fn empty_submitter_id_is_rejected_before_any_lookup() {
        let submitter = submitter();
        let err = submitter.submit("", request()).unwrap_err();
        assert!(matches!(err, AdmissionError::InvalidRequest(_)));
    }
}
