//! Metrics collection and reporting using metrics-rs.
//!
//! Dispatch records one counter per decision. Nothing is stored unless a
//! recorder is installed; the CLI installs [`CliRecorder`] with `--metrics`.

use std::collections::HashMap;
use std::sync::Arc;

use emtrace_guest::StringReadError;
use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter,
};
use parking_lot::RwLock;

use crate::dispatch::EventKind;

// ============================================================================
// Metric descriptions
// ============================================================================

/// Initialize metric descriptions.
///
/// Call this once at startup to register metric descriptions.
pub fn init() {
    describe_counter!(
        "emtrace_events_total",
        Unit::Count,
        "Entry and return events delivered to the tracer"
    );
    describe_counter!(
        "emtrace_unknown_symbols_total",
        Unit::Count,
        "Events for symbols without a signature"
    );
    describe_counter!(
        "emtrace_suppressed_events_total",
        Unit::Count,
        "Events for denylisted bookkeeping symbols"
    );
    describe_counter!(
        "emtrace_spurious_returns_total",
        Unit::Count,
        "Return events discarded by the correlator"
    );
    describe_counter!(
        "emtrace_displaced_calls_total",
        Unit::Count,
        "Pending calls overwritten by a new entry"
    );
    describe_counter!(
        "emtrace_string_faults_total",
        Unit::Count,
        "Guest string reads that faulted or hit the window cap"
    );
}

// ============================================================================
// Metric recording functions
// ============================================================================

pub fn record_event(kind: EventKind) {
    counter!("emtrace_events_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_unknown_symbol() {
    counter!("emtrace_unknown_symbols_total").increment(1);
}

pub fn record_suppressed() {
    counter!("emtrace_suppressed_events_total").increment(1);
}

pub fn record_spurious_return() {
    counter!("emtrace_spurious_returns_total").increment(1);
}

pub fn record_displaced_call() {
    counter!("emtrace_displaced_calls_total").increment(1);
}

/// Record a failed string read, labelled `unmapped` or `truncated`.
pub fn record_string_fault(err: &StringReadError) {
    let kind = match err {
        StringReadError::Unmapped { .. } => "unmapped",
        StringReadError::Truncated { .. } => "truncated",
    };
    counter!("emtrace_string_faults_total", "kind" => kind).increment(1);
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

/// Storage for counter values.
#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

/// Counter-only recorder that keeps values in memory for a summary.
///
/// Gauges and histograms are accepted and discarded; the tracer records
/// neither.
#[derive(Default)]
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
}

impl CliRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install this recorder as the global metrics recorder.
    ///
    /// Returns `None` if a recorder is already installed.
    pub fn install(self) -> Option<CliRecorderHandle> {
        let counters = Arc::clone(&self.counters);
        metrics::set_global_recorder(self).ok()?;
        Some(CliRecorderHandle { counters })
    }
}

fn key_to_string(key: &Key) -> String {
    let name = key.name();
    let mut labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        return name.to_string();
    }
    labels.sort();
    format!("{}{{{}}}", name, labels.join(","))
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// Handle for reading counters after installing the CLI recorder.
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
}

impl CliRecorderHandle {
    /// Get a counter value by key, e.g. `emtrace_events_total{kind=entry}`.
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    /// Sorted `key: value` lines.
    pub fn summary_lines(&self) -> Vec<String> {
        let counters = self.counters.values.read();
        let mut keys: Vec<_> = counters.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| format!("{key}: {}", counters[key]))
            .collect()
    }

    /// Print all collected counters to stderr.
    ///
    /// Trace output may be on stdout, so the summary stays out of it.
    pub fn print_summary(&self) {
        let lines = self.summary_lines();
        if lines.is_empty() {
            eprintln!("No metrics collected.");
            return;
        }
        eprintln!();
        eprintln!("## Metrics Summary");
        eprintln!();
        eprintln!("### Counters");
        for line in lines {
            eprintln!("  {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use metrics::with_local_recorder;

    use super::*;

    fn local_recorder() -> (CliRecorder, CliRecorderHandle) {
        let recorder = CliRecorder::new();
        let handle = CliRecorderHandle {
            counters: Arc::clone(&recorder.counters),
        };
        (recorder, handle)
    }

    #[test]
    fn test_counters_recorded() {
        let (recorder, handle) = local_recorder();
        with_local_recorder(&recorder, || {
            record_event(EventKind::Entry);
            record_event(EventKind::Entry);
            record_event(EventKind::Return);
            record_spurious_return();
        });

        assert_eq!(handle.get_counter("emtrace_events_total{kind=entry}"), Some(2));
        assert_eq!(handle.get_counter("emtrace_events_total{kind=return}"), Some(1));
        assert_eq!(handle.get_counter("emtrace_spurious_returns_total"), Some(1));
        assert_eq!(handle.get_counter("emtrace_displaced_calls_total"), None);
    }

    #[test]
    fn test_string_fault_labels() {
        let (recorder, handle) = local_recorder();
        with_local_recorder(&recorder, || {
            record_string_fault(&StringReadError::Truncated {
                start: 0x1000,
                partial: Vec::new(),
                windows: 64,
            });
        });
        assert_eq!(
            handle.get_counter("emtrace_string_faults_total{kind=truncated}"),
            Some(1)
        );
    }

    #[test]
    fn test_summary_sorted() {
        let (recorder, handle) = local_recorder();
        with_local_recorder(&recorder, || {
            record_unknown_symbol();
            record_displaced_call();
        });
        assert_eq!(
            handle.summary_lines(),
            [
                "emtrace_displaced_calls_total: 1",
                "emtrace_unknown_symbols_total: 1"
            ]
        );
    }
}
