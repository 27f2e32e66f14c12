//! Environment Reset
//!
//! Cold trials must start from a clean slate: the target application and the
//! processes it depends on are torn down before the launch is timed.
//! `ResetPolicy` is the hook the runner calls; `Platform` is the set of
//! primitives a policy needs from the device or host it runs against.

use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by platform primitives
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Errors raised while resetting the environment
#[derive(Debug, Error)]
pub enum ResetError {
    #[error("failed to stop target `{target}`: {source}")]
    TargetStop {
        target: String,
        #[source]
        source: PlatformError,
    },

    #[error("system did not become idle after teardown: {0}")]
    Idle(#[source] PlatformError),
}

/// Primitives a reset policy needs from the platform under test
pub trait Platform {
    /// Identities of every process providing `capability`
    fn providers(&self, capability: &str) -> Result<Vec<String>, PlatformError>;

    /// Ask the platform to terminate a background process
    fn kill_background(&self, id: &str) -> Result<(), PlatformError>;

    /// Forcibly stop an application and its process group
    fn force_stop(&self, id: &str) -> Result<(), PlatformError>;

    /// Block until the platform reports it is idle
    fn wait_for_idle(&self) -> Result<(), PlatformError>;
}

/// Brings the environment to the state a trial expects
pub trait ResetPolicy {
    /// Reset synchronously; the environment is ready when this returns `Ok`
    fn reset(&mut self) -> Result<(), ResetError>;
}

impl<R: ResetPolicy + ?Sized> ResetPolicy for Box<R> {
    fn reset(&mut self) -> Result<(), ResetError> {
        (**self).reset()
    }
}

impl<R: ResetPolicy + ?Sized> ResetPolicy for &mut R {
    fn reset(&mut self) -> Result<(), ResetError> {
        (**self).reset()
    }
}

/// Leaves the environment untouched (warm starts)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResetPolicy;

impl ResetPolicy for NullResetPolicy {
    fn reset(&mut self) -> Result<(), ResetError> {
        Ok(())
    }
}

/// Kills every provider of a capability, force-stops the target, then waits
/// for the platform to settle (cold starts).
///
/// Provider termination is best-effort: failures are logged and skipped.
/// Failing to stop the target or to reach idle fails the reset.
#[derive(Debug, Clone)]
pub struct ForceStopResetPolicy<P> {
    platform: P,
    target: String,
    capability: Option<String>,
}

impl<P: Platform> ForceStopResetPolicy<P> {
    /// Policy that force-stops `target` on `platform`
    pub fn new(platform: P, target: impl Into<String>) -> Self {
        Self {
            platform,
            target: target.into(),
            capability: None,
        }
    }

    /// Also terminate every process providing `capability`
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    /// Target application identity
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Underlying platform
    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn kill_providers(&self, capability: &str) {
        let providers = match self.platform.providers(capability) {
            Ok(providers) => providers,
            Err(e) => {
                warn!(capability, error = %e, "failed to enumerate providers; skipping");
                return;
            }
        };

        for provider in &providers {
            if let Err(e) = self.platform.kill_background(provider) {
                warn!(provider = %provider, error = %e, "failed to kill provider");
            }
        }
        debug!(capability, count = providers.len(), "providers terminated");
    }
}

impl<P: Platform> ResetPolicy for ForceStopResetPolicy<P> {
    fn reset(&mut self) -> Result<(), ResetError> {
        if let Some(capability) = self.capability.as_deref() {
            self.kill_providers(capability);
        }

        self.platform
            .force_stop(&self.target)
            .map_err(|source| ResetError::TargetStop {
                target: self.target.clone(),
                source,
            })?;

        self.platform.wait_for_idle().map_err(ResetError::Idle)?;
        debug!(app = %self.target, "environment reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakePlatform {
        providers: Vec<String>,
        broken_provider: Option<String>,
        fail_enumeration: bool,
        fail_force_stop: bool,
        fail_idle: bool,
        calls: RefCell<Vec<String>>,
    }

    impl Platform for FakePlatform {
        fn providers(&self, capability: &str) -> Result<Vec<String>, PlatformError> {
            self.calls.borrow_mut().push(format!("providers {capability}"));
            if self.fail_enumeration {
                return Err(PlatformError::Other("package manager unavailable".into()));
            }
            Ok(self.providers.clone())
        }

        fn kill_background(&self, id: &str) -> Result<(), PlatformError> {
            self.calls.borrow_mut().push(format!("kill {id}"));
            if self.broken_provider.as_deref() == Some(id) {
                return Err(PlatformError::Other("permission denied".into()));
            }
            Ok(())
        }

        fn force_stop(&self, id: &str) -> Result<(), PlatformError> {
            self.calls.borrow_mut().push(format!("force-stop {id}"));
            if self.fail_force_stop {
                return Err(PlatformError::Other("no such package".into()));
            }
            Ok(())
        }

        fn wait_for_idle(&self) -> Result<(), PlatformError> {
            self.calls.borrow_mut().push("idle".to_string());
            if self.fail_idle {
                return Err(PlatformError::Other("device offline".into()));
            }
            Ok(())
        }
    }

    fn calls(policy: &ForceStopResetPolicy<FakePlatform>) -> Vec<String> {
        policy.platform().calls.borrow().clone()
    }

    #[test]
    fn test_reset_order() {
        let platform = FakePlatform {
            providers: vec!["com.a".into(), "com.b".into()],
            ..Default::default()
        };
        let mut policy =
            ForceStopResetPolicy::new(platform, "com.target").with_capability("documents");

        policy.reset().unwrap();

        assert_eq!(
            calls(&policy),
            vec![
                "providers documents",
                "kill com.a",
                "kill com.b",
                "force-stop com.target",
                "idle",
            ]
        );
    }

    #[test]
    fn test_without_capability_skips_providers() {
        let mut policy = ForceStopResetPolicy::new(FakePlatform::default(), "com.target");
        policy.reset().unwrap();
        assert_eq!(calls(&policy), vec!["force-stop com.target", "idle"]);
    }

    #[test]
    fn test_provider_failure_is_ignored() {
        let platform = FakePlatform {
            providers: vec!["com.a".into(), "com.b".into()],
            broken_provider: Some("com.a".into()),
            ..Default::default()
        };
        let mut policy =
            ForceStopResetPolicy::new(platform, "com.target").with_capability("documents");

        policy.reset().unwrap();
        assert!(calls(&policy).contains(&"kill com.b".to_string()));
    }

    #[test]
    fn test_enumeration_failure_is_ignored() {
        let platform = FakePlatform {
            fail_enumeration: true,
            ..Default::default()
        };
        let mut policy =
            ForceStopResetPolicy::new(platform, "com.target").with_capability("documents");

        policy.reset().unwrap();
        assert!(calls(&policy).contains(&"force-stop com.target".to_string()));
    }

    #[test]
    fn test_target_stop_failure_is_fatal() {
        let platform = FakePlatform {
            fail_force_stop: true,
            ..Default::default()
        };
        let mut policy = ForceStopResetPolicy::new(platform, "com.target");

        let err = policy.reset().unwrap_err();
        assert!(matches!(err, ResetError::TargetStop { ref target, .. } if target == "com.target"));
        // Never waits for idle after a failed stop
        assert!(!calls(&policy).contains(&"idle".to_string()));
    }

    #[test]
    fn test_idle_failure_is_fatal() {
        let platform = FakePlatform {
            fail_idle: true,
            ..Default::default()
        };
        let mut policy = ForceStopResetPolicy::new(platform, "com.target");

        assert!(matches!(policy.reset().unwrap_err(), ResetError::Idle(_)));
    }

    #[test]
    fn test_null_policy() {
        assert!(NullResetPolicy.reset().is_ok());
    }

    #[test]
    fn test_boxed_policy() {
        let mut policy: Box<dyn ResetPolicy> = Box::new(NullResetPolicy);
        assert!(policy.reset().is_ok());
    }
}
