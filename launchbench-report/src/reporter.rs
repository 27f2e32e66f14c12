//! Metrics Reporter
//!
//! Converts the ordered trial durations of one run into a `BenchmarkReport`.

use crate::report::BenchmarkReport;
use launchbench_stats::{StatsError, select_median};
use std::time::Duration;

/// Unit annotation appended to published metric keys
pub const UNIT_ANNOTATION: &str = "(ms)";

/// Builds reports from collected durations
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsReporter;

impl MetricsReporter {
    /// Summarize durations under `metric_key`.
    ///
    /// Fails with [`StatsError::EmptySample`] when fewer than two durations
    /// are supplied. Pure: the same input always yields the same report.
    pub fn summarize(
        metric_key: &str,
        durations: &[Duration],
    ) -> Result<BenchmarkReport, StatsError> {
        let raw_durations_ms: Vec<f64> = durations.iter().map(|d| to_millis(*d)).collect();
        let median_ms = select_median(&raw_durations_ms)?;

        Ok(BenchmarkReport {
            metric_key: metric_key.to_string(),
            median_ms,
            sample_count: raw_durations_ms.len(),
            raw_durations_ms,
        })
    }
}

fn to_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
