use crate::progress::{ProgressBus, ProgressEvent};
use crate::user_limits::UserLimitsCache;
use battle_models::{
    BaseDirection, CombatAttributes, DirectionalFrameSet, GenerationResult, Job, JobError, RetryConfig,
};
use battle_telemetry::MetricsCollector;
use chrono::Utc;
use generation_client::GenerationBackend;
use queue_store::{ActiveJobSet, CacheStore, DedupStore, JobStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const DIRECTIONS: [BaseDirection; 3] = [BaseDirection::East, BaseDirection::NorthEast, BaseDirection::SouthEast];

/// Pulls jobs from the queue and drives them through the pipeline. One
/// instance runs per concurrent worker slot
/// (`queue.worker_concurrency` of them); each polls the job store for the
/// next pending job and carries it through the four external-call stages,
/// retrying on a retryable failure up to `retry.max_retries` times with
/// exponential backoff before giving up.
pub struct PipelineWorker {
    job_store: Arc<JobStore>,
    cache_store: Arc<CacheStore>,
    dedup_store: Arc<DedupStore>,
    active_jobs: Arc<ActiveJobSet>,
    user_limits: Arc<UserLimitsCache>,
    progress: Arc<ProgressBus>,
    metrics: Arc<MetricsCollector>,
    backend: Arc<dyn GenerationBackend>,
    retry: RetryConfig,
    cache_ttl_days: u32,
    poll_interval: Duration,
}

impl PipelineWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_store: Arc<JobStore>,
        cache_store: Arc<CacheStore>,
        dedup_store: Arc<DedupStore>,
        active_jobs: Arc<ActiveJobSet>,
        user_limits: Arc<UserLimitsCache>,
        progress: Arc<ProgressBus>,
        metrics: Arc<MetricsCollector>,
        backend: Arc<dyn GenerationBackend>,
        retry: RetryConfig,
        cache_ttl_days: u32,
    ) -> Self {
        Self {
            job_store,
            cache_store,
            dedup_store,
            active_jobs,
            user_limits,
            progress,
            metrics,
            backend,
            retry,
            cache_ttl_days,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Runs until the process shuts down. Idle polling backs off to
    /// `poll_interval` between empty pulls rather than busy-spinning; a real
    /// durable queue would instead block on a pop, but the in-memory store
    /// has no such primitive.
    pub async fn run(self, worker_index: usize) {
        let mut ticker = interval(self.poll_interval);
        info!(worker_index, "pipeline worker online");
        loop {
            ticker.tick().await;
            match self.job_store.pull_next_pending() {
                Some(job_id) => self.process(job_id).await,
                None => continue,
            }
        }
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn process(&self, job_id: Uuid) {
        let Some(job) = self.job_store.get(job_id) else {
            warn!("pulled job id not present in store, skipping");
            return;
        };

        let started_at = Utc::now();
        let wait_ms = (started_at - job.submitted_at).num_milliseconds().max(0);
        self.job_store.update(job_id, |j| j.mark_started(started_at));
        self.metrics.record_start(job_id, wait_ms);

        let mut attempt: u32 = 0;
        loop {
            match self.run_attempt(&job).await {
                Ok(result) => {
                    self.commit_success(job_id, &job.submitter_id, &job.fingerprint, result).await;
                    return;
                }
                Err(error) => {
                    if error.retryable() && attempt < self.retry.max_retries {
                        attempt += 1;
                        // A server-provided delay (e.g. `Retry-After` on a 429) wins over our
                        // own exponential backoff schedule.
                        let backoff = error.retry_after().unwrap_or_else(|| {
                            let delay_ms = self.retry.backoff_delay_ms as f64 * self.retry.backoff_multiplier.powi(attempt as i32 - 1);
                            Duration::from_millis(delay_ms as u64)
                        });
                        warn!(attempt, backoff_ms = backoff.as_millis() as u64, %error, "attempt failed, retrying");
                        self.job_store.update(job_id, |j| j.mark_retrying());
                        tokio::time::sleep(backoff).await;
                        let resumed_at = Utc::now();
                        self.job_store.update(job_id, |j| j.mark_started(resumed_at));
                        continue;
                    }
                    error!(%error, attempts = attempt + 1, "attempt failed, giving up");
                    self.commit_failure(job_id, &job.submitter_id, JobError { category: error, message: "generation failed".into() }).await;
                    return;
                }
            }
        }
    }

    /// One full pass through all four stages. Progress events are published
    /// after each stage completes so subscribers see coarse-grained
    /// milestones (25/50/75/100) rather than a single jump to completion.
    async fn run_attempt(&self, job: &Job) -> Result<GenerationResult, battle_models::GenerationErrorCategory> {
        let job_id = job.job_id;

        let base_sprite = self.call(self.backend.generate_base_sprite(&job.request)).await?;
        self.report_progress(job_id, 25);

        let analysis = self.call(self.backend.analyze_sprite(&base_sprite)).await?;
        self.report_progress(job_id, 50);

        let attributes: CombatAttributes = self.call(self.backend.derive_combat_attributes(&analysis)).await?;
        self.report_progress(job_id, 75);

        let mut directional_frames = Vec::with_capacity(DIRECTIONS.len());
        for direction in DIRECTIONS {
            let frames = self.call(self.backend.generate_direction_frames(&base_sprite, direction)).await?;
            directional_frames.push(DirectionalFrameSet { direction: frames.direction, walk: frames.walk, idle: frames.idle, attack: frames.attack });
        }
        self.report_progress(job_id, 100);

        Ok(GenerationResult { base_sprite, attributes, directional_frames })
    }

    /// Bounds a single external call by `retry.call_timeout_ms`; a call that
    /// overruns is folded into the same retryable `Timeout` category as a
    /// backend-reported timeout, so the retry path doesn't need to know the
    /// difference.
    async fn call<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, battle_models::GenerationErrorCategory>>,
    ) -> Result<T, battle_models::GenerationErrorCategory> {
        match tokio::time::timeout(Duration::from_millis(self.retry.call_timeout_ms), fut).await {
            Ok(result) => result,
            Err(_) => Err(battle_models::GenerationErrorCategory::Timeout),
        }
    }

    fn report_progress(&self, job_id: Uuid, percent: u8) {
        self.job_store.update(job_id, |j| j.mark_progress(percent));
        self.progress.publish(ProgressEvent::Progress { job_id, percent });
    }

    async fn commit_success(&self, job_id: Uuid, submitter_id: &str, fingerprint: &Option<fingerprint::Fingerprint>, result: GenerationResult) {
        let now = Utc::now();
        self.job_store.update(job_id, |j| j.mark_completed(result.clone(), now));
        if let Some(fp) = fingerprint {
            self.cache_store.put(*fp, result.clone(), self.cache_ttl_days, now);
            self.dedup_store.remove(submitter_id, fp);
        }
        self.active_jobs.remove(submitter_id, job_id);
        self.user_limits.invalidate(submitter_id);

        if let Some(job) = self.job_store.get(job_id) {
            let duration_ms = job.started_at.map(|s| (now - s).num_milliseconds().max(0)).unwrap_or(0);
            self.metrics.record_complete(job_id, duration_ms);
            debug!(duration_ms, "job completed");
            self.progress.publish(ProgressEvent::Completed { job_id, job: Box::new(job) });
        }
        self.progress.retire(job_id);
    }

    async fn commit_failure(&self, job_id: Uuid, submitter_id: &str, error: JobError) {
        let now = Utc::now();
        self.job_store.update(job_id, |j| j.mark_failed(error.clone(), now));
        if let Some(job) = self.job_store.get(job_id) {
            if let Some(fp) = job.fingerprint {
                self.dedup_store.remove(submitter_id, &fp);
            }
        }
        self.active_jobs.remove(submitter_id, job_id);
        self.user_limits.invalidate(submitter_id);
        self.metrics.record_failed(job_id);
        self.progress.publish(ProgressEvent::Failed { job_id, error });
        self.progress.retire(job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressBus;
    use battle_models::{Dimensions, GenerationErrorCategory, GenerationRequest, JobState};
    use fingerprint::fingerprint_of;
    use generation_client::MockGenerationBackend;

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

    fn worker(backend: Arc<MockGenerationBackend>, retry: RetryConfig) -> (PipelineWorker, Arc<JobStore>) {
        let job_store = Arc::new(JobStore::new());
        let worker = PipelineWorker::new(
            job_store.clone(),
            Arc::new(CacheStore::new()),
            Arc::new(DedupStore::new()),
            Arc::new(ActiveJobSet::new()),
            Arc::new(UserLimitsCache::new()),
            Arc::new(ProgressBus::new()),
            Arc::new(MetricsCollector::new()),
            backend,
            retry,
            30,
        );
        (worker, job_store)
    }

    fn admit(job_store: &JobStore) -> Uuid {
        let request = request();
        let fp = fingerprint_of(&request).unwrap();
        let job_id = Uuid::new_v4();
        job_store.enqueue(Job::new(job_id, "u1".into(), fp, request, Utc::now()));
        job_id
    }

    #[tokio::test]
    async fn a_clean_attempt_completes_with_full_progress_and_a_cached_result() {
        let backend = Arc::new(MockGenerationBackend::new());
        let (worker, job_store) = worker(backend, RetryConfig { max_retries: 1, backoff_delay_ms: 1, backoff_multiplier: 1.0, call_timeout_ms: 5_000 });
        let job_id = admit(&job_store);

        worker.process(job_id).await;

        let job = job_store.get(job_id).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.attempts_made, 0);
    }

    #[tokio::test]
    async fn a_retryable_failure_is_retried_once_and_then_succeeds() {
        let backend = Arc::new(MockGenerationBackend::new());
        backend.queue_failure(GenerationErrorCategory::Network { cause: "connection reset".into() });
        let (worker, job_store) = worker(backend, RetryConfig { max_retries: 1, backoff_delay_ms: 1, backoff_multiplier: 1.0, call_timeout_ms: 5_000 });
        let job_id = admit(&job_store);

        worker.process(job_id).await;

        let job = job_store.get(job_id).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.attempts_made, 1);
    }

    #[tokio::test]
    async fn retries_exhausted_leaves_the_job_failed() {
        let backend = Arc::new(MockGenerationBackend::new());
        backend.queue_failure(GenerationErrorCategory::Timeout);
        backend.queue_failure(GenerationErrorCategory::Timeout);
        let (worker, job_store) = worker(backend, RetryConfig { max_retries: 1, backoff_delay_ms: 1, backoff_multiplier: 1.0, call_timeout_ms: 5_000 });
        let job_id = admit(&job_store);

        worker.process(job_id).await;

        let job = job_store.get(job_id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(matches!(job.error.unwrap().category, GenerationErrorCategory::Timeout));
    }

    #[tokio::test]
    async fn a_non_retryable_failure_fails_on_the_first_attempt() {
        let backend = Arc::new(MockGenerationBackend::new());
        backend.queue_failure(GenerationErrorCategory::Authentication);
        let (worker, job_store) = worker(backend, RetryConfig { max_retries: 3, backoff_delay_ms: 1, backoff_multiplier: 1.0, call_timeout_ms: 5_000 });
        let job_id = admit(&job_store);

        worker.process(job_id).await;

        let job = job_store.get(job_id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts_made, 0);
    }
}
