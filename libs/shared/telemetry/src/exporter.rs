use crate::collector::MetricsCollector;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

/// Converts [`MetricsCollector`] snapshots into Prometheus text exposition
/// format. The collector's counters are themselves snapshot-style reads of
/// atomic totals; this exporter tracks what it last emitted so a counter
/// that appears to have gone backward (process restart, counter reset)
/// still renders as monotonically non-decreasing across scrapes, per
/// Prometheus's counter contract.
pub struct PrometheusExporter {
    collector: Arc<MetricsCollector>,
    state: Mutex<ExporterState>,
}

#[derive(Default)]
struct ExporterState {
    last_raw_hits: u64,
    cumulative_hits: u64,
    last_raw_misses: u64,
    cumulative_misses: u64,
}

impl PrometheusExporter {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector, state: Mutex::new(ExporterState::default()) }
    }

    pub fn render(&self) -> String {
        let snapshot = self.collector.snapshot();
        let mut state = self.state.lock().expect("exporter state lock poisoned");

        let hits_delta = if snapshot.cache_hits >= state.last_raw_hits {
            snapshot.cache_hits - state.last_raw_hits
        } else {
            snapshot.cache_hits
        };
        state.cumulative_hits += hits_delta;
        state.last_raw_hits = snapshot.cache_hits;

        let misses_delta = if snapshot.cache_misses >= state.last_raw_misses {
            snapshot.cache_misses - state.last_raw_misses
        } else {
            snapshot.cache_misses
        };
        state.cumulative_misses += misses_delta;
        state.last_raw_misses = snapshot.cache_misses;

        let total = state.cumulative_hits + state.cumulative_misses;
        let hit_rate = if total == 0 { 0.0 } else { state.cumulative_hits as f64 / total as f64 };

        let mut out = String::new();

        let _ = writeln!(out, "# HELP queue_jobs_total Number of jobs currently in each state.");
        let _ = writeln!(out, "# TYPE queue_jobs_total gauge");
        let _ = writeln!(out, "queue_jobs_total{{state=\"pending\"}} {}", snapshot.states.pending);
        let _ = writeln!(out, "queue_jobs_total{{state=\"processing\"}} {}", snapshot.states.processing);
        let _ = writeln!(out, "queue_jobs_total{{state=\"completed\"}} {}", snapshot.states.completed);
        let _ = writeln!(out, "queue_jobs_total{{state=\"failed\"}} {}", snapshot.states.failed);

        let _ = writeln!(out, "# HELP queue_cache_hit_rate Fraction of submissions served from cache.");
        let _ = writeln!(out, "# TYPE queue_cache_hit_rate gauge");
        let _ = writeln!(out, "queue_cache_hit_rate {hit_rate}");

        let _ = writeln!(out, "# HELP queue_cache_hits_total Total cache hits observed.");
        let _ = writeln!(out, "# TYPE queue_cache_hits_total counter");
        let _ = writeln!(out, "queue_cache_hits_total {}", state.cumulative_hits);

        let _ = writeln!(out, "# HELP queue_cache_misses_total Total cache misses observed.");
        let _ = writeln!(out, "# TYPE queue_cache_misses_total counter");
        let _ = writeln!(out, "queue_cache_misses_total {}", state.cumulative_misses);

        let _ = writeln!(out, "# HELP queue_job_duration_milliseconds Pipeline attempt duration.");
        let _ = writeln!(out, "# TYPE queue_job_duration_milliseconds summary");
        let _ = writeln!(out, "queue_job_duration_milliseconds{{quantile=\"0.95\"}} {}", snapshot.job_duration_ms.p95);
        let _ = writeln!(out, "queue_job_duration_milliseconds_sum {}", snapshot.job_duration_ms.mean * snapshot.job_duration_ms.count as f64);
        let _ = writeln!(out, "queue_job_duration_milliseconds_count {}", snapshot.job_duration_ms.count);

        let _ = writeln!(out, "# HELP queue_wait_time_milliseconds Time a job spent waiting before a worker picked it up.");
        let _ = writeln!(out, "# TYPE queue_wait_time_milliseconds summary");
        let _ = writeln!(out, "queue_wait_time_milliseconds{{quantile=\"0.95\"}} {}", snapshot.queue_wait_ms.p95);
        let _ = writeln!(out, "queue_wait_time_milliseconds_sum {}", snapshot.queue_wait_ms.mean * snapshot.queue_wait_ms.count as f64);
        let _ = writeln!(out, "queue_wait_time_milliseconds_count {}", snapshot.queue_wait_ms.count);

        let _ = writeln!(out, "# HELP queue_active_users Distinct submitters with a job in pending or processing.");
        let _ = writeln!(out, "# TYPE queue_active_users gauge");
        let _ = writeln!(out, "queue_active_users {}", snapshot.active_submitters);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_is_idempotent_under_no_activity() {
        let collector = Arc::new(MetricsCollector::new());
        collector.record_cache_hit();
        let exporter = PrometheusExporter::new(collector);
        let first = exporter.render();
        let second = exporter.render();
        assert_eq!(first, second);
    }

    #[test]
    fn text_contains_required_lines_after_activity() {
        use uuid::Uuid;
        let collector = Arc::new(MetricsCollector::new());
        collector.record_submitted(Uuid::new_v4(), "u1".into());
        collector.record_submitted(Uuid::new_v4(), "u1".into());
        collector.record_cache_hit();
        let exporter = PrometheusExporter::new(collector);
        let text = exporter.render();
        assert!(text.contains("queue_jobs_total{state=\"pending\"} 2"));
        assert!(text.contains("queue_cache_hits_total 1"));
        assert!(text.contains("queue_active_users 1"));
        assert!(text.contains("# TYPE queue_jobs_total gauge"));
    }
}
