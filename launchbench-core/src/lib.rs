#![warn(missing_docs)]
//! launchbench Core - Trial Runtime
//!
//! This crate provides the execution environment for startup benchmarks:
//! - `TrialClock` for per-trial wall-clock timing
//! - `CompletionSignal`, a one-shot rendezvous between the action under test
//!   and the runner waiting for it
//! - `ResetPolicy` hooks that return the environment to a clean slate before
//!   cold trials
//! - `TrialRunner` and `BenchmarkHarness` to drive N sequential trials

mod action;
mod clock;
mod harness;
mod reset;
mod runner;
mod signal;

pub use action::{ActionError, TriggerAction};
pub use clock::TrialClock;
pub use harness::{BenchmarkHarness, HarnessError};
pub use reset::{
    ForceStopResetPolicy, NullResetPolicy, Platform, PlatformError, ResetError, ResetPolicy,
};
pub use runner::{StartMode, Trial, TrialError, TrialRunner};
pub use signal::{
    Completion, CompletionSignal, CompletionWaiter, Outcome, WaitError, completion_channel,
};

pub use launchbench_report::{BenchmarkReport, MetricsReporter};
pub use launchbench_stats::{MIN_SAMPLE_COUNT, StatsError};
