//! Observability: scan telemetry counters and the sink boundary.
//!
//! The scan core records events through `sink::record`; it never touches
//! counter state directly.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::ScanCounters;
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
