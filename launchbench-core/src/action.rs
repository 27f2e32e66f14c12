//! Action Under Test
//!
//! The operation whose startup latency is measured, e.g. launching an
//! activity or spawning a service. `trigger` must only *start* the work and
//! return; completion is reported through the [`CompletionSignal`] it is
//! given.

use crate::signal::CompletionSignal;
use thiserror::Error;

/// Error returned when an action could not be started
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    /// Create an error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for ActionError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Starts the asynchronous operation under test.
///
/// Implementations keep (or pass on) `completion` and fulfill it once the
/// operation has finished. Fulfilling it before `trigger` returns is allowed.
pub trait TriggerAction {
    /// Begin the operation; must not block until it completes
    fn trigger(&mut self, completion: CompletionSignal) -> Result<(), ActionError>;

    /// Abandon the operation started by the last `trigger`.
    ///
    /// Called by the runner when a trial times out, before the next trial
    /// starts. The default does nothing.
    fn cancel(&mut self) {}
}

impl<F> TriggerAction for F
where
    F: FnMut(CompletionSignal) -> Result<(), ActionError>,
{
    fn trigger(&mut self, completion: CompletionSignal) -> Result<(), ActionError> {
        self(completion)
    }
}
