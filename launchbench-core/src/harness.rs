//! Benchmark Harness
//!
//! Drives a fixed number of sequential trials and reduces their durations to
//! a `BenchmarkReport`. A run either produces a report covering every
//! configured trial or fails as a whole; partial sample sets are never
//! summarized.

use crate::action::TriggerAction;
use crate::reset::{NullResetPolicy, PlatformError, ResetPolicy};
use crate::runner::{StartMode, Trial, TrialError, TrialRunner};
use launchbench_report::{BenchmarkReport, MetricsReporter};
use launchbench_stats::{MIN_SAMPLE_COUNT, StatsError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a harness run
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("trial {index} failed: {cause}")]
    TrialFailure {
        index: usize,
        #[source]
        cause: TrialError,
    },

    #[error(transparent)]
    EmptySample(#[from] StatsError),
}

type TrialObserver = Box<dyn FnMut(&Trial)>;

/// Orchestrates N trials of one action and reports the median
pub struct BenchmarkHarness<R = NullResetPolicy> {
    name: String,
    runner: TrialRunner<R>,
    observer: Option<TrialObserver>,
}

impl BenchmarkHarness<NullResetPolicy> {
    /// Harness for the application called `name` with no reset policy.
    ///
    /// `name` prefixes the metric keys, e.g. `files` yields
    /// `files-cold-start-performance-median`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runner: TrialRunner::new(NullResetPolicy),
            observer: None,
        }
    }
}

impl<R: ResetPolicy> BenchmarkHarness<R> {
    /// Replace the policy used to reset the environment before cold trials
    pub fn with_reset_policy<P: ResetPolicy>(self, policy: P) -> BenchmarkHarness<P> {
        BenchmarkHarness {
            name: self.name,
            runner: self.runner.with_reset_policy(policy),
            observer: self.observer,
        }
    }

    /// Run `hook` before every launch, after any reset
    pub fn with_settle(
        mut self,
        hook: impl FnMut() -> Result<(), PlatformError> + 'static,
    ) -> Self {
        self.runner = self.runner.with_settle(hook);
        self
    }

    /// Fail a trial whose action does not complete within `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    /// Call `observer` after every recorded trial
    pub fn on_trial(mut self, observer: impl FnMut(&Trial) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Application name used in metric keys
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying trial runner
    pub fn runner(&self) -> &TrialRunner<R> {
        &self.runner
    }

    /// Metric key for runs in `mode`
    pub fn metric_key(&self, mode: StartMode) -> String {
        format!("{}-{}-start-performance-median", self.name, mode.as_str())
    }

    /// Run `trial_count` trials of `action` in `mode` and summarize them.
    ///
    /// The first failing trial aborts the run with
    /// [`HarnessError::TrialFailure`]; no retries are attempted.
    pub fn run<A>(
        &mut self,
        trial_count: usize,
        mode: StartMode,
        action: &mut A,
    ) -> Result<BenchmarkReport, HarnessError>
    where
        A: TriggerAction + ?Sized,
    {
        if trial_count == 0 {
            return Err(HarnessError::InvalidConfiguration(
                "trial count must be greater than zero".to_string(),
            ));
        }
        // Fail before launching anything if the result could never be summarized
        if trial_count < MIN_SAMPLE_COUNT {
            return Err(StatsError::EmptySample {
                count: trial_count,
                min: MIN_SAMPLE_COUNT,
            }
            .into());
        }

        info!(app = %self.name, %mode, trials = trial_count, "starting benchmark run");

        let mut durations = Vec::with_capacity(trial_count);
        for index in 0..trial_count {
            let duration = self.runner.run_one(mode, action).map_err(|cause| {
                warn!(app = %self.name, %mode, index, error = %cause, "trial failed; aborting run");
                HarnessError::TrialFailure { index, cause }
            })?;

            let trial = Trial {
                index,
                duration,
                mode,
            };
            debug!(index, %mode, duration_ms = duration.as_secs_f64() * 1000.0, "trial recorded");
            if let Some(observer) = self.observer.as_mut() {
                observer(&trial);
            }
            durations.push(trial.duration);
        }

        let report = MetricsReporter::summarize(&self.metric_key(mode), &durations)?;
        info!(
            metric = %report.annotated_key(),
            median_ms = report.median_ms,
            samples = report.sample_count,
            "benchmark run complete"
        );
        Ok(report)
    }
}
