#![warn(missing_docs)]
//! launchbench Report - Reporting and Output
//!
//! Turns collected trial durations into reports and hands them on:
//! - `MetricsReporter` reduces durations to a `BenchmarkReport`
//! - `ReportSink` implementations receive `(key, value)` metrics
//! - JSON (machine-readable) and human (terminal) renderings of a run

mod human;
mod json;
mod report;
mod reporter;
mod sink;

pub use human::format_human_output;
pub use json::generate_json_report;
pub use report::{BenchmarkReport, ReportMeta, RunReport};
pub use reporter::{MetricsReporter, UNIT_ANNOTATION};
pub use sink::{LogSink, MemorySink, ReportSink};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON document
    Json,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("TEXT".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
