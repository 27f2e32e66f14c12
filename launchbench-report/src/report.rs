//! Report Data Structures

use crate::reporter::UNIT_ANNOTATION;
use crate::sink::ReportSink;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary of one harness run.
///
/// Created once after every trial has completed; `raw_durations_ms` always
/// holds exactly `sample_count` values in trial order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Metric key without unit annotation
    pub metric_key: String,
    /// Selected median duration in milliseconds
    pub median_ms: f64,
    /// Number of trials summarized
    pub sample_count: usize,
    /// Per-trial durations in milliseconds, in trial order
    pub raw_durations_ms: Vec<f64>,
}

impl BenchmarkReport {
    /// Metric key as published, e.g. `app-cold-start-performance-median(ms)`
    pub fn annotated_key(&self) -> String {
        format!("{}{}", self.metric_key, UNIT_ANNOTATION)
    }

    /// Selected median as a `Duration`
    pub fn median(&self) -> Duration {
        Duration::try_from_secs_f64(self.median_ms / 1000.0).unwrap_or_default()
    }

    /// Publish the median to a sink as a single `(key, value)` pair
    pub fn emit(&self, sink: &mut dyn ReportSink) {
        sink.record(&self.annotated_key(), self.median_ms);
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// launchbench version that produced the report
    pub version: String,
    /// UTC time the report was assembled
    pub timestamp: DateTime<Utc>,
    /// Identity of the application under test
    pub target: String,
    /// Configured trial count per mode
    pub trials: usize,
    /// Completion wait bound in milliseconds, if any
    pub timeout_ms: Option<f64>,
}

impl ReportMeta {
    /// Metadata stamped with the current time
    pub fn new(target: impl Into<String>, trials: usize, timeout: Option<Duration>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            target: target.into(),
            trials,
            timeout_ms: timeout.map(|t| t.as_secs_f64() * 1000.0),
        }
    }
}

/// Complete output of a CLI invocation: one report per start mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run metadata
    pub meta: ReportMeta,
    /// Per-mode benchmark reports
    pub results: Vec<BenchmarkReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn sample_report() -> BenchmarkReport {
        BenchmarkReport {
            metric_key: "files-cold-start-performance-median".to_string(),
            median_ms: 250.0,
            sample_count: 2,
            raw_durations_ms: vec![300.0, 250.0],
        }
    }

    #[test]
    fn test_annotated_key() {
        assert_eq!(
            sample_report().annotated_key(),
            "files-cold-start-performance-median(ms)"
        );
    }

    #[test]
    fn test_median_duration() {
        assert_eq!(sample_report().median(), Duration::from_millis(250));
    }

    #[test]
    fn test_emit_records_single_pair() {
        let mut sink = MemorySink::new();
        sample_report().emit(&mut sink);

        assert_eq!(
            sink.records(),
            &[("files-cold-start-performance-median(ms)".to_string(), 250.0)]
        );
    }

    #[test]
    fn test_meta_timeout_in_ms() {
        let meta = ReportMeta::new("com.example", 10, Some(Duration::from_secs(5)));
        assert_eq!(meta.timeout_ms, Some(5000.0));
        assert_eq!(meta.trials, 10);
    }
}
