use serde::{Deserialize, Serialize};

/// Top-level configuration table, grouped by subsystem. Loaded from TOML in
/// the gateway binary; defaults here are sane enough for the service to run
/// unconfigured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub queue: QueueConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub stream: StreamConfig,
    pub dedup: DedupConfig,
    pub simulator: SimulatorConfig,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            stream: StreamConfig::default(),
            dedup: DedupConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub worker_concurrency: usize,
    pub max_jobs_per_user: u32,
    pub system_queue_limit: u32,
    pub warning_threshold: u32,
    pub critical_threshold: u32,
    pub avg_processing_time_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 4,
            max_jobs_per_user: 5,
            system_queue_limit: 200,
            warning_threshold: 150,
            critical_threshold: 190,
            avg_processing_time_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_days: 30 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Bound on any single external call (image/vision/animator). A call
    /// that exceeds this is treated as a retryable `Timeout`.
    pub call_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 1, backoff_delay_ms: 500, backoff_multiplier: 2.0, call_timeout_ms: 15_000 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub update_interval_ms: u64,
    pub keepalive_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { update_interval_ms: 500, keepalive_interval_ms: 25_000 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub window_seconds: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { window_seconds: 10 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub tick_rate: u32,
    pub max_ticks: u64,
    pub speed_multiplier: f64,
    pub grid_width: i32,
    pub grid_height: i32,
    pub event_retention_ticks: u64,
    pub target_selection_radius: i32,
    pub snapshot_fanout_hz: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_ticks: 3600,
            speed_multiplier: 1.0,
            grid_width: 20,
            grid_height: 20,
            event_retention_ticks: 300,
            target_selection_radius: 30,
            snapshot_fanout_hz: 10,
        }
    }
}

impl SimulatorConfig {
    pub fn tick_duration_ms(&self) -> u32 {
        ((1000.0 / self.tick_rate as f64) / self.speed_multiplier) as u32
    }
}
