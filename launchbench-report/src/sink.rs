//! Report Sinks
//!
//! Destinations for published metrics. A sink only needs to accept
//! `(key, value)` pairs; what happens to them afterwards is up to the sink.

use tracing::info;

/// Receives published metrics
pub trait ReportSink {
    /// Record one metric value under `key`
    fn record(&mut self, key: &str, value: f64);
}

/// Collects metrics in memory, in the order they were recorded
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<(String, f64)>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(key, value)` pairs
    pub fn records(&self) -> &[(String, f64)] {
        &self.records
    }

    /// Most recent value recorded under `key`
    pub fn get(&self, key: &str) -> Option<f64> {
        self.records
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }
}

impl ReportSink for MemorySink {
    fn record(&mut self, key: &str, value: f64) {
        self.records.push((key.to_string(), value));
    }
}

/// Publishes each metric as a structured `tracing` event
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn record(&mut self, key: &str, value: f64) {
        info!(metric = key, value, "metric");
    }
}
