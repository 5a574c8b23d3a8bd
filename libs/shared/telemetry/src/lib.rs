//! Metrics collection and Prometheus exposition for both cores.

pub mod collector;
pub mod distribution;
pub mod exporter;

pub use collector::{MetricsCollector, MetricsSnapshot, StateGauges};
pub use distribution::{Distribution, DistributionSummary};
pub use exporter::PrometheusExporter;
