#![warn(missing_docs)]
//! # launchbench
//!
//! Startup latency benchmarks for applications under test.
//!
//! launchbench runs an action (typically "launch this application") a fixed
//! number of times and reports a single median metric per start mode:
//! - **Cold starts**: the target and every provider of a chosen capability are
//!   torn down before each launch through a `ResetPolicy`
//! - **Warm starts**: launches run back to back without touching the environment
//! - **Completion signalling**: the action fulfills a one-shot
//!   `CompletionSignal` whenever it is done, from any thread
//! - **Reporting**: metrics are published as
//!   `<name>-<mode>-start-performance-median(ms)` to any `ReportSink`
//!
//! ## Quick Start
//!
//! ```no_run
//! use launchbench::prelude::*;
//! use std::time::Duration;
//!
//! let mut harness = BenchmarkHarness::new("files").with_timeout(Some(Duration::from_secs(30)));
//! let mut launch = |signal: CompletionSignal| {
//!     std::thread::spawn(move || {
//!         // start the application and wait until it is usable
//!         signal.complete();
//!     });
//!     Ok::<(), ActionError>(())
//! };
//!
//! let report = harness.run(10, StartMode::Warm, &mut launch)?;
//! report.emit(&mut LogSink);
//! # Ok::<(), HarnessError>(())
//! ```
//!
//! ## Median
//!
//! The reported median is the element at index `n/2 - 1` of the sorted
//! durations: the lower middle for even `n`, one below the middle for odd
//! `n`. At least two trials are required.

// Re-export core types
pub use launchbench_core::{
    ActionError, BenchmarkHarness, Completion, CompletionSignal, CompletionWaiter,
    ForceStopResetPolicy, HarnessError, NullResetPolicy, Outcome, Platform, PlatformError,
    ResetError, ResetPolicy, StartMode, Trial, TrialClock, TrialError, TrialRunner,
    TriggerAction, WaitError, completion_channel,
};

// Re-export reporting
pub use launchbench_report::{
    BenchmarkReport, LogSink, MemorySink, MetricsReporter, OutputFormat, ReportMeta, ReportSink,
    RunReport, UNIT_ANNOTATION, format_human_output, generate_json_report,
};

// Re-export stats
pub use launchbench_stats::{MIN_SAMPLE_COUNT, StatsError, median_index, select_median};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ActionError, BenchmarkHarness, BenchmarkReport, CompletionSignal, ForceStopResetPolicy,
        HarnessError, LogSink, MemorySink, MetricsReporter, NullResetPolicy, Platform,
        ReportSink, ResetPolicy, StartMode, TriggerAction,
    };
}

/// Run the launchbench CLI.
///
/// Call this from a binary's `main()`:
/// ```ignore
/// fn main() {
///     launchbench::run().unwrap();
/// }
/// ```
pub use launchbench_cli::run;
