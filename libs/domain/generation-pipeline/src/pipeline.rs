use crate::progress::ProgressBus;
use crate::queue_monitor::QueueSizeMonitor;
use crate::submitter::JobSubmitter;
use crate::user_limits::UserLimitsCache;
use crate::worker::PipelineWorker;
use battle_models::BattleConfig;
use battle_telemetry::MetricsCollector;
use generation_client::GenerationBackend;
use queue_store::{ActiveJobSet, CacheStore, DedupStore, JobStore};
use std::sync::Arc;
use tracing::info;

/// Wires every generation-pipeline component onto one shared set of stores,
/// holding the handles every service and handler borrows from without
/// owning the services themselves. The gateway binary constructs one of
/// these at startup and hands clones of the `Arc` fields to its route
/// handlers.
pub struct GenerationPipeline {
    pub job_store: Arc<JobStore>,
    pub cache_store: Arc<CacheStore>,
    pub dedup_store: Arc<DedupStore>,
    pub active_jobs: Arc<ActiveJobSet>,
    pub user_limits: Arc<UserLimitsCache>,
    pub progress: Arc<ProgressBus>,
    pub metrics: Arc<MetricsCollector>,
    pub queue_monitor: Arc<QueueSizeMonitor>,
    pub submitter: Arc<JobSubmitter>,
    config: BattleConfig,
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationPipeline {
    pub fn new(config: BattleConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        let job_store = Arc::new(JobStore::new());
        let cache_store = Arc::new(CacheStore::new());
        let dedup_store = Arc::new(DedupStore::new());
        let active_jobs = Arc::new(ActiveJobSet::new());
        let user_limits = Arc::new(UserLimitsCache::new());
        let progress = Arc::new(ProgressBus::new());
        let metrics = Arc::new(MetricsCollector::new());
        let queue_monitor = Arc::new(QueueSizeMonitor::new(job_store.clone(), config.queue));

        let submitter = Arc::new(JobSubmitter::new(
            job_store.clone(),
            cache_store.clone(),
            dedup_store.clone(),
            active_jobs.clone(),
            user_limits.clone(),
            metrics.clone(),
            queue_monitor.clone(),
            config.clone(),
        ));

        Self { job_store, cache_store, dedup_store, active_jobs, user_limits, progress, metrics, queue_monitor, submitter, config, backend }
    }

    /// Spawns `queue.worker_concurrency` pipeline workers plus the queue
    /// monitor's polling daemon as background tasks. Returns immediately;
    /// the spawned tasks run for the lifetime of the process.
    pub fn spawn_background_tasks(&self) {
        for worker_index in 0..self.config.queue.worker_concurrency {
            let worker = PipelineWorker::new(
                self.job_store.clone(),
                self.cache_store.clone(),
                self.dedup_store.clone(),
                self.active_jobs.clone(),
                self.user_limits.clone(),
                self.progress.clone(),
                self.metrics.clone(),
                self.backend.clone(),
                self.config.retry,
                self.config.cache.ttl_days,
            );
            tokio::spawn(worker.run(worker_index));
        }

        let monitor = self.queue_monitor.clone();
        let interval_ms = self.config.stream.update_interval_ms;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
            info!("queue size monitor daemon active");
            loop {
                ticker.tick().await;
                monitor.poll();
            }
        });
    }
}
