//! Completion Signal
//!
//! Single-use rendezvous between the action under test and the trial runner.
//!
//! The runner creates a `(CompletionSignal, CompletionWaiter)` pair before
//! triggering the action and hands the signal to it. The action fulfills the
//! signal from whatever thread observes completion; the runner awaits the
//! waiter. The first fulfillment wins, later ones are no-ops, and awaiting a
//! signal that was fulfilled before the wait started returns immediately.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;

/// Successful completion of the action under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// When the producer fulfilled the signal
    pub at: Instant,
    /// Duration measured by the action itself, if it reports one
    pub reported: Option<Duration>,
}

/// Value delivered through the signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action finished
    Completed(Completion),
    /// The action gave up; carries the reason
    Failed(String),
}

/// Errors observed by the waiting side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// Every producer handle was dropped without fulfilling the signal
    #[error("completion signal dropped before the action completed")]
    Dropped,

    /// The bounded wait elapsed first
    #[error("no completion within {0:?}")]
    TimedOut(Duration),
}

/// Create a fresh signal and the waiter paired with it
pub fn completion_channel() -> (CompletionSignal, CompletionWaiter) {
    let (tx, rx) = oneshot::channel();
    (
        CompletionSignal {
            slot: Arc::new(Mutex::new(Some(tx))),
        },
        CompletionWaiter { rx },
    )
}

/// Producer half, handed to the action under test.
///
/// Cheap to clone; all clones share one slot. When the last clone is dropped
/// without fulfilling, the waiter observes [`WaitError::Dropped`].
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    slot: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl CompletionSignal {
    /// Mark the action complete now.
    ///
    /// Returns `false` if the signal was already fulfilled or nobody is
    /// waiting anymore.
    pub fn complete(&self) -> bool {
        self.deliver(Outcome::Completed(Completion {
            at: Instant::now(),
            reported: None,
        }))
    }

    /// Mark the action complete with a duration it measured itself
    pub fn complete_with(&self, reported: Duration) -> bool {
        self.deliver(Outcome::Completed(Completion {
            at: Instant::now(),
            reported: Some(reported),
        }))
    }

    /// Mark the action failed
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.deliver(Outcome::Failed(reason.into()))
    }

    /// Whether some clone of this signal has already been fulfilled
    pub fn is_fulfilled(&self) -> bool {
        self.lock_slot().is_none()
    }

    fn deliver(&self, outcome: Outcome) -> bool {
        let sender = self.lock_slot().take();
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<Outcome>>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Consumer half, kept by the trial runner
#[derive(Debug)]
pub struct CompletionWaiter {
    rx: oneshot::Receiver<Outcome>,
}

impl CompletionWaiter {
    /// Wait for the outcome, optionally bounded by `timeout`
    pub async fn wait(self, timeout: Option<Duration>) -> Result<Outcome, WaitError> {
        match timeout {
            None => self.rx.await.map_err(|_| WaitError::Dropped),
            Some(limit) => match tokio::time::timeout(limit, self.rx).await {
                Ok(Ok(outcome)) => Ok(outcome),
                Ok(Err(_)) => Err(WaitError::Dropped),
                Err(_) => Err(WaitError::TimedOut(limit)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_fulfilled_before_wait_returns_immediately() {
        let (signal, waiter) = completion_channel();
        assert!(signal.complete());

        let outcome = block_on(waiter.wait(Some(Duration::from_millis(10)))).unwrap();
        assert!(matches!(outcome, Outcome::Completed(Completion { reported: None, .. })));
    }

    #[test]
    fn test_second_fulfillment_is_noop() {
        let (signal, waiter) = completion_channel();
        let other = signal.clone();

        assert!(signal.complete_with(Duration::from_millis(7)));
        assert!(!other.fail("late"));
        assert!(!signal.complete());
        assert!(other.is_fulfilled());

        match block_on(waiter.wait(None)).unwrap() {
            Outcome::Completed(c) => assert_eq!(c.reported, Some(Duration::from_millis(7))),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_fulfilled_from_other_thread() {
        let (signal, waiter) = completion_channel();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            signal.complete()
        });

        let outcome = block_on(waiter.wait(None)).unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_failure_delivered() {
        let (signal, waiter) = completion_channel();
        signal.fail("activity crashed");

        let outcome = block_on(waiter.wait(None)).unwrap();
        assert_eq!(outcome, Outcome::Failed("activity crashed".to_string()));
    }

    #[test]
    fn test_dropped_signal() {
        let (signal, waiter) = completion_channel();
        let clone = signal.clone();
        drop(signal);
        drop(clone);

        let err = block_on(waiter.wait(None)).unwrap_err();
        assert_eq!(err, WaitError::Dropped);
    }

    #[test]
    fn test_timeout() {
        let (_signal, waiter) = completion_channel();
        let limit = Duration::from_millis(20);

        let err = block_on(waiter.wait(Some(limit))).unwrap_err();
        assert_eq!(err, WaitError::TimedOut(limit));
    }

    #[test]
    fn test_complete_after_waiter_gone() {
        let (signal, waiter) = completion_channel();
        drop(waiter);
        assert!(!signal.complete());
        assert!(signal.is_fulfilled());
    }
}
