//! Metrics sink boundary.
//!
//! Scan logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics::{self, ScanCounters};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ScanOpened,
    RowsDelivered { rows: u64, bytes: u64 },
    AncestorRefetch { synthesized: bool },
    ScanClosed { rows: u64, repeated: u64 },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local counters.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::ScanOpened => m.scans_opened = m.scans_opened.saturating_add(1),
            MetricsEvent::RowsDelivered { rows, bytes } => {
                m.rows_delivered = m.rows_delivered.saturating_add(rows);
                m.bytes_delivered = m.bytes_delivered.saturating_add(bytes);
                m.buffers_delivered = m.buffers_delivered.saturating_add(1);
            }
            MetricsEvent::AncestorRefetch { synthesized } => {
                m.ancestor_refetches = m.ancestor_refetches.saturating_add(1);
                if synthesized {
                    m.ancestors_synthesized = m.ancestors_synthesized.saturating_add(1);
                }
            }
            MetricsEvent::ScanClosed { repeated, .. } => {
                m.scans_closed = m.scans_closed.saturating_add(1);
                m.rows_repeated = m.rows_repeated.saturating_add(repeated);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the counters of this thread.
#[must_use]
pub fn metrics_report() -> ScanCounters {
    metrics::with_state(Clone::clone)
}

/// Reset all counters of this thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
