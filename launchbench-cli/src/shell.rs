//! Shell-Command Platform
//!
//! Bridges the harness to a real device or host through configured shell
//! commands (`sh -c`). Every collaborator is a template; launchbench only
//! substitutes placeholders and interprets exit status and output.

use crate::config::CommandsConfig;
use launchbench_core::{ActionError, CompletionSignal, Platform, PlatformError, TriggerAction};
use regex::Regex;
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Substitute `{key}` with `value` in a command template
pub fn expand(template: &str, key: &str, value: &str) -> String {
    template.replace(&format!("{{{key}}}"), value)
}

/// Run a command through `sh -c`, returning its stdout on success
fn run_shell(command: &str) -> Result<String, PlatformError> {
    debug!(command, "running platform command");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        return Err(PlatformError::CommandFailed {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Platform whose primitives are shell command templates.
///
/// Unset templates are no-ops, except `force_stop`, which fails: a cold
/// start cannot be guaranteed without it.
#[derive(Debug, Clone, Default)]
pub struct ShellPlatform {
    list_providers: Option<String>,
    kill_background: Option<String>,
    force_stop: Option<String>,
    wait_idle: Option<String>,
}

impl ShellPlatform {
    /// Build from the `[commands]` section
    pub fn from_config(commands: &CommandsConfig) -> Self {
        Self {
            list_providers: commands.list_providers.clone(),
            kill_background: commands.kill_background.clone(),
            force_stop: commands.force_stop.clone(),
            wait_idle: commands.wait_idle.clone(),
        }
    }
}

impl Platform for ShellPlatform {
    fn providers(&self, capability: &str) -> Result<Vec<String>, PlatformError> {
        let Some(template) = &self.list_providers else {
            return Ok(Vec::new());
        };
        let stdout = run_shell(&expand(template, "capability", capability))?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn kill_background(&self, id: &str) -> Result<(), PlatformError> {
        match &self.kill_background {
            Some(template) => run_shell(&expand(template, "provider", id)).map(|_| ()),
            None => Ok(()),
        }
    }

    fn force_stop(&self, id: &str) -> Result<(), PlatformError> {
        let template = self
            .force_stop
            .as_ref()
            .ok_or_else(|| PlatformError::Other("no force_stop command configured".into()))?;
        run_shell(&expand(template, "target", id)).map(|_| ())
    }

    fn wait_for_idle(&self) -> Result<(), PlatformError> {
        match &self.wait_idle {
            Some(command) => run_shell(command).map(|_| ()),
            None => Ok(()),
        }
    }
}

/// Launches the target with a shell command and watches it for completion.
///
/// Without a ready pattern the trial completes when the command exits
/// successfully. With one, it completes on the first matching output line;
/// if the pattern's first capture group parses as a number, that many
/// milliseconds is reported as the trial duration.
#[derive(Debug)]
pub struct ShellLaunchAction {
    command: String,
    ready_pattern: Option<Regex>,
    running: Option<Arc<Mutex<Child>>>,
}

fn lock_child(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ShellLaunchAction {
    /// Action running `command` verbatim
    pub fn new(command: impl Into<String>, ready_pattern: Option<Regex>) -> Self {
        Self {
            command: command.into(),
            ready_pattern,
            running: None,
        }
    }

    /// Build from the `[commands]` section, substituting `{target}`
    pub fn from_config(commands: &CommandsConfig, target: &str) -> Result<Self, regex::Error> {
        let ready_pattern = commands
            .ready_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        Ok(Self::new(
            expand(&commands.launch, "target", target),
            ready_pattern,
        ))
    }

    /// Expanded launch command
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl TriggerAction for ShellLaunchAction {
    fn trigger(&mut self, completion: CompletionSignal) -> Result<(), ActionError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ActionError::new(format!("failed to spawn `{}`: {e}", self.command)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ActionError::new("launch command has no stdout"))?;

        let child = Arc::new(Mutex::new(child));
        let watcher = LaunchWatcher {
            command: self.command.clone(),
            ready_pattern: self.ready_pattern.clone(),
            completion,
            child: Arc::clone(&child),
        };
        std::thread::Builder::new()
            .name("launchbench-launch".to_string())
            .spawn(move || watcher.watch(stdout))?;

        self.running = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        let Some(child) = self.running.take() else {
            return;
        };
        let mut child = lock_child(&child);
        if let Ok(None) = child.try_wait() {
            match child.kill() {
                Ok(()) => debug!(command = %self.command, "killed abandoned launch"),
                Err(e) => warn!(command = %self.command, error = %e, "failed to kill launch"),
            }
        }
    }
}

/// Follows one launch on its own thread and fulfills the trial's signal
struct LaunchWatcher {
    command: String,
    ready_pattern: Option<Regex>,
    completion: CompletionSignal,
    child: Arc<Mutex<Child>>,
}

impl LaunchWatcher {
    fn watch(self, stdout: ChildStdout) {
        // Keep draining after a match so the child never blocks on a full pipe
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "stopped reading launch output");
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            trace!(line, "launch output");
            if let Some(pattern) = &self.ready_pattern {
                if let Some(reported) = match_ready(pattern, line) {
                    match reported {
                        Some(duration) => self.completion.complete_with(duration),
                        None => self.completion.complete(),
                    };
                }
            }
        }

        match self.wait_for_exit() {
            Ok(status) if status.success() => {
                if self.ready_pattern.is_none() {
                    self.completion.complete();
                } else {
                    // No-op when the pattern already matched
                    self.completion
                        .fail(format!("`{}` exited without printing a ready line", self.command));
                }
            }
            Ok(status) => {
                self.completion
                    .fail(format!("`{}` exited with {status}", self.command));
            }
            Err(e) => {
                self.completion
                    .fail(format!("failed to wait on `{}`: {e}", self.command));
            }
        }
    }

    /// Poll for exit without holding the lock, so `cancel` can still kill
    fn wait_for_exit(&self) -> std::io::Result<ExitStatus> {
        loop {
            if let Some(status) = lock_child(&self.child).try_wait()? {
                return Ok(status);
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}

/// `None` if `line` does not match; `Some(reported)` otherwise, where
/// `reported` is the numeric first capture group read as milliseconds.
fn match_ready(pattern: &Regex, line: &str) -> Option<Option<Duration>> {
    let captures = pattern.captures(line)?;
    let reported = captures
        .get(1)
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
        .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok());
    Some(reported)
}
