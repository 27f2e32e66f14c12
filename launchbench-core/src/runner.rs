//! Trial Runner
//!
//! Executes one measured launch-and-wait cycle:
//! reset (cold only) → settle → arm signal → start clock → trigger → wait → stop.

use crate::action::{ActionError, TriggerAction};
use crate::clock::TrialClock;
use crate::reset::{NullResetPolicy, PlatformError, ResetError, ResetPolicy};
use crate::signal::{CompletionWaiter, Outcome, WaitError, completion_channel};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Start mode of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartMode {
    /// Target and its providers are torn down before every launch
    Cold,
    /// Launch without touching the environment
    Warm,
}

impl StartMode {
    /// Lowercase name used in metric keys
    pub fn as_str(self) -> &'static str {
        match self {
            StartMode::Cold => "cold",
            StartMode::Warm => "warm",
        }
    }

    /// Whether trials in this mode reset the environment first
    pub fn resets_environment(self) -> bool {
        matches!(self, StartMode::Cold)
    }
}

impl std::fmt::Display for StartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StartMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cold" => Ok(StartMode::Cold),
            "warm" => Ok(StartMode::Warm),
            other => Err(format!("Unknown start mode: {}", other)),
        }
    }
}

/// One recorded trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trial {
    /// Zero-based position in the run
    pub index: usize,
    /// Measured startup duration
    pub duration: Duration,
    /// Mode the trial ran in
    pub mode: StartMode,
}

/// Why a single trial failed
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("environment reset failed: {0}")]
    Reset(#[from] ResetError),

    #[error("environment did not settle before launch: {0}")]
    Settle(#[source] PlatformError),

    #[error("failed to trigger action: {0}")]
    Trigger(#[source] ActionError),

    #[error("action reported failure: {0}")]
    ActionFailed(String),

    #[error("completion signal dropped before the action completed")]
    SignalDropped,

    #[error("action did not complete within {0:?}")]
    Timeout(Duration),

    #[error("failed to start wait runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<WaitError> for TrialError {
    fn from(e: WaitError) -> Self {
        match e {
            WaitError::Dropped => TrialError::SignalDropped,
            WaitError::TimedOut(limit) => TrialError::Timeout(limit),
        }
    }
}

type SettleHook = Box<dyn FnMut() -> Result<(), PlatformError>>;

/// Runs single trials against a reset policy
pub struct TrialRunner<R = NullResetPolicy> {
    reset_policy: R,
    settle: Option<SettleHook>,
    timeout: Option<Duration>,
    // Reused across trials to avoid per-trial runtime construction
    cached_runtime: Option<tokio::runtime::Runtime>,
}

impl Default for TrialRunner<NullResetPolicy> {
    fn default() -> Self {
        Self::new(NullResetPolicy)
    }
}

impl<R: ResetPolicy> TrialRunner<R> {
    /// Create a runner that resets through `reset_policy` before cold trials
    pub fn new(reset_policy: R) -> Self {
        Self {
            reset_policy,
            settle: None,
            timeout: None,
            cached_runtime: None,
        }
    }

    /// Swap the reset policy, keeping timeout and settle hook
    pub fn with_reset_policy<P: ResetPolicy>(self, reset_policy: P) -> TrialRunner<P> {
        TrialRunner {
            reset_policy,
            settle: self.settle,
            timeout: self.timeout,
            cached_runtime: self.cached_runtime,
        }
    }

    /// Run `hook` before every trigger, in both modes, after any reset.
    ///
    /// Typically waits for the platform to become idle so a launch never
    /// overlaps the tail of the previous one.
    pub fn with_settle(
        mut self,
        hook: impl FnMut() -> Result<(), PlatformError> + 'static,
    ) -> Self {
        self.settle = Some(Box::new(hook));
        self
    }

    /// Bound the completion wait; `None` waits indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured completion wait bound
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Reset policy used before cold trials
    pub fn reset_policy(&self) -> &R {
        &self.reset_policy
    }

    /// Mutable access to the reset policy
    pub fn reset_policy_mut(&mut self) -> &mut R {
        &mut self.reset_policy
    }

    /// Consume the runner, returning its reset policy
    pub fn into_reset_policy(self) -> R {
        self.reset_policy
    }

    /// Execute one trial and return its duration.
    ///
    /// The signal is armed before `trigger` runs, so an action that completes
    /// synchronously inside `trigger` is still observed. If the action
    /// reports its own measurement, that value is returned instead of the
    /// clock reading.
    pub fn run_one<A>(&mut self, mode: StartMode, action: &mut A) -> Result<Duration, TrialError>
    where
        A: TriggerAction + ?Sized,
    {
        if mode.resets_environment() {
            self.reset_policy.reset()?;
        }
        if let Some(settle) = self.settle.as_mut() {
            settle().map_err(TrialError::Settle)?;
        }

        let (signal, waiter) = completion_channel();
        let clock = TrialClock::start();
        action.trigger(signal).map_err(TrialError::Trigger)?;
        trace!(%mode, "action triggered");

        let outcome = match self.block_on_completion(waiter) {
            Ok(outcome) => outcome,
            Err(e) => {
                if matches!(e, TrialError::Timeout(_)) {
                    debug!(%mode, "cancelling timed-out action");
                    action.cancel();
                }
                return Err(e);
            }
        };

        match outcome {
            Outcome::Completed(completion) => Ok(completion
                .reported
                .unwrap_or_else(|| clock.elapsed_until(completion.at))),
            Outcome::Failed(reason) => Err(TrialError::ActionFailed(reason)),
        }
    }

    /// Block the calling thread until the waiter resolves.
    ///
    /// Inside a multi-threaded tokio runtime the wait runs on the current
    /// worker via `block_in_place`; calling this from a current-thread
    /// runtime is not supported.
    fn block_on_completion(&mut self, waiter: CompletionWaiter) -> Result<Outcome, TrialError> {
        let timeout = self.timeout;

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let outcome =
                tokio::task::block_in_place(|| handle.block_on(waiter.wait(timeout)))?;
            return Ok(outcome);
        }

        let rt = match self.cached_runtime.take() {
            Some(rt) => rt,
            None => tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?,
        };
        let result = rt.block_on(waiter.wait(timeout));
        self.cached_runtime = Some(rt);

        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::CompletionSignal;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct CountingReset {
        resets: usize,
        fail: bool,
    }

    impl ResetPolicy for CountingReset {
        fn reset(&mut self) -> Result<(), ResetError> {
            self.resets += 1;
            if self.fail {
                return Err(ResetError::Idle(PlatformError::Other("stuck".into())));
            }
            Ok(())
        }
    }

    fn instant_action(signal: CompletionSignal) -> Result<(), ActionError> {
        signal.complete();
        Ok(())
    }

    #[test]
    fn test_start_mode_parse() {
        assert_eq!("COLD".parse::<StartMode>(), Ok(StartMode::Cold));
        assert_eq!("warm".parse::<StartMode>(), Ok(StartMode::Warm));
        assert!("hot".parse::<StartMode>().is_err());
        assert_eq!(StartMode::Cold.to_string(), "cold");
    }

    #[test]
    fn test_cold_trial_resets_first() {
        let mut runner = TrialRunner::new(CountingReset::default());
        let mut action = instant_action;

        runner.run_one(StartMode::Cold, &mut action).unwrap();
        runner.run_one(StartMode::Cold, &mut action).unwrap();
        assert_eq!(runner.reset_policy().resets, 2);
    }

    #[test]
    fn test_warm_trial_skips_reset() {
        let mut runner = TrialRunner::new(CountingReset::default());
        let mut action = instant_action;

        runner.run_one(StartMode::Warm, &mut action).unwrap();
        assert_eq!(runner.reset_policy().resets, 0);
    }

    #[test]
    fn test_completion_inside_trigger_is_observed() {
        let mut runner =
            TrialRunner::<NullResetPolicy>::default().with_timeout(Some(Duration::from_secs(1)));
        let mut action = instant_action;

        let duration = runner.run_one(StartMode::Warm, &mut action).unwrap();
        assert!(duration < Duration::from_secs(1));
    }

    #[test]
    fn test_measures_async_completion() {
        let mut runner = TrialRunner::<NullResetPolicy>::default();
        let mut action = |signal: CompletionSignal| {
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                signal.complete();
            });
            Ok::<(), ActionError>(())
        };

        let duration = runner.run_one(StartMode::Warm, &mut action).unwrap();
        assert!(duration >= Duration::from_millis(20));
        assert!(duration < Duration::from_millis(500));
    }

    #[test]
    fn test_reported_duration_wins() {
        let mut runner = TrialRunner::<NullResetPolicy>::default();
        let mut action = |signal: CompletionSignal| {
            signal.complete_with(Duration::from_millis(321));
            Ok::<(), ActionError>(())
        };

        let duration = runner.run_one(StartMode::Warm, &mut action).unwrap();
        assert_eq!(duration, Duration::from_millis(321));
    }

    #[test]
    fn test_reset_failure_skips_trigger() {
        let mut runner = TrialRunner::new(CountingReset {
            fail: true,
            ..Default::default()
        });
        let mut triggered = false;
        let mut action = |signal: CompletionSignal| {
            triggered = true;
            signal.complete();
            Ok::<(), ActionError>(())
        };

        let err = runner.run_one(StartMode::Cold, &mut action).unwrap_err();
        assert!(matches!(err, TrialError::Reset(_)));
        assert!(!triggered);
    }

    #[test]
    fn test_trigger_error() {
        let mut runner = TrialRunner::<NullResetPolicy>::default();
        let mut action =
            |_signal: CompletionSignal| Err::<(), ActionError>(ActionError::new("no device"));

        let err = runner.run_one(StartMode::Warm, &mut action).unwrap_err();
        assert!(matches!(err, TrialError::Trigger(ref e) if e.message() == "no device"));
    }

    #[test]
    fn test_action_failure() {
        let mut runner = TrialRunner::<NullResetPolicy>::default();
        let mut action = |signal: CompletionSignal| {
            signal.fail("activity crashed");
            Ok::<(), ActionError>(())
        };

        let err = runner.run_one(StartMode::Warm, &mut action).unwrap_err();
        assert!(matches!(err, TrialError::ActionFailed(ref r) if r == "activity crashed"));
    }

    #[test]
    fn test_dropped_signal() {
        let mut runner = TrialRunner::<NullResetPolicy>::default();
        let mut action = |signal: CompletionSignal| {
            drop(signal);
            Ok::<(), ActionError>(())
        };

        let err = runner.run_one(StartMode::Warm, &mut action).unwrap_err();
        assert!(matches!(err, TrialError::SignalDropped));
    }

    #[test]
    fn test_timeout() {
        let mut runner = TrialRunner::<NullResetPolicy>::default()
            .with_timeout(Some(Duration::from_millis(30)));
        let mut pending = Vec::new();
        let mut action = |signal: CompletionSignal| {
            pending.push(signal);
            Ok::<(), ActionError>(())
        };

        let err = runner.run_one(StartMode::Warm, &mut action).unwrap_err();
        assert!(matches!(err, TrialError::Timeout(d) if d == Duration::from_millis(30)));
    }

    #[test]
    fn test_timeout_cancels_action() {
        struct Stalled {
            pending: Vec<CompletionSignal>,
            cancels: usize,
        }

        impl TriggerAction for Stalled {
            fn trigger(&mut self, completion: CompletionSignal) -> Result<(), ActionError> {
                self.pending.push(completion);
                Ok(())
            }

            fn cancel(&mut self) {
                self.cancels += 1;
            }
        }

        let mut runner = TrialRunner::<NullResetPolicy>::default()
            .with_timeout(Some(Duration::from_millis(20)));
        let mut action = Stalled {
            pending: Vec::new(),
            cancels: 0,
        };

        assert!(runner.run_one(StartMode::Warm, &mut action).is_err());
        assert_eq!(action.cancels, 1);
    }

    #[test]
    fn test_failed_action_is_not_cancelled() {
        struct Failing {
            cancels: usize,
        }

        impl TriggerAction for Failing {
            fn trigger(&mut self, completion: CompletionSignal) -> Result<(), ActionError> {
                completion.fail("crashed");
                Ok(())
            }

            fn cancel(&mut self) {
                self.cancels += 1;
            }
        }

        let mut runner = TrialRunner::<NullResetPolicy>::default();
        let mut action = Failing { cancels: 0 };
        assert!(runner.run_one(StartMode::Warm, &mut action).is_err());
        assert_eq!(action.cancels, 0);
    }

    #[test]
    fn test_settle_runs_before_every_trigger() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let settled = Rc::clone(&events);
        let mut runner = TrialRunner::new(CountingReset::default()).with_settle(move || {
            settled.borrow_mut().push("settle");
            Ok(())
        });

        let triggered = Rc::clone(&events);
        let mut action = move |signal: CompletionSignal| {
            triggered.borrow_mut().push("trigger");
            signal.complete();
            Ok::<(), ActionError>(())
        };

        runner.run_one(StartMode::Warm, &mut action).unwrap();
        runner.run_one(StartMode::Cold, &mut action).unwrap();

        assert_eq!(
            *events.borrow(),
            vec!["settle", "trigger", "settle", "trigger"]
        );
        assert_eq!(runner.reset_policy().resets, 1);
    }

    #[test]
    fn test_settle_failure_skips_trigger() {
        let mut runner = TrialRunner::<NullResetPolicy>::default()
            .with_settle(|| Err(PlatformError::Other("device busy".into())));
        let mut triggered = false;
        let mut action = |signal: CompletionSignal| {
            triggered = true;
            signal.complete();
            Ok::<(), ActionError>(())
        };

        let err = runner.run_one(StartMode::Warm, &mut action).unwrap_err();
        assert!(matches!(err, TrialError::Settle(_)));
        assert!(!triggered);
    }

    #[test]
    fn test_policy_swap_keeps_settle() {
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let mut runner = TrialRunner::<NullResetPolicy>::default()
            .with_settle(move || {
                *counter.borrow_mut() += 1;
                Ok(())
            })
            .with_reset_policy(CountingReset::default());

        let mut action = instant_action;
        runner.run_one(StartMode::Cold, &mut action).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_inside_multi_thread_runtime() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .unwrap();

        let duration = rt.block_on(async {
            tokio::task::spawn(async {
                let mut runner = TrialRunner::<NullResetPolicy>::default();
                let mut action = instant_action;
                runner.run_one(StartMode::Warm, &mut action)
            })
            .await
            .unwrap()
        });
        assert!(duration.is_ok());
    }
}
