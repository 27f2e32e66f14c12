//! Configuration loading from launch.toml
//!
//! launchbench configuration can be specified in a `launch.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use anyhow::Context;
use launchbench_core::StartMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name searched for during discovery
pub const CONFIG_FILE_NAME: &str = "launch.toml";

/// launchbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LaunchConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Application under test
    #[serde(default)]
    pub target: TargetConfig,
    /// Platform command templates
    #[serde(default)]
    pub commands: CommandsConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which start modes to benchmark
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ModeSelection {
    /// Cold starts only
    Cold,
    /// Warm starts only
    Warm,
    /// Cold starts, then warm starts
    #[default]
    Both,
}

impl ModeSelection {
    /// Start modes in execution order
    pub fn modes(self) -> Vec<StartMode> {
        match self {
            ModeSelection::Cold => vec![StartMode::Cold],
            ModeSelection::Warm => vec![StartMode::Warm],
            ModeSelection::Both => vec![StartMode::Cold, StartMode::Warm],
        }
    }
}

/// Runner configuration for benchmark execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Trials per start mode
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Start modes to run: "cold", "warm" or "both"
    #[serde(default)]
    pub mode: ModeSelection,
    /// Completion wait bound per trial (e.g. "30s"); unbounded when unset
    #[serde(default)]
    pub timeout: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            mode: ModeSelection::default(),
            timeout: None,
        }
    }
}

fn default_trials() -> usize {
    10
}

/// Application under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Short name used in metric keys
    #[serde(default = "default_target_name")]
    pub name: String,
    /// Platform identity of the application (package name, binary, unit...)
    #[serde(default)]
    pub id: String,
    /// Capability whose providers are killed before cold starts
    #[serde(default)]
    pub provider_capability: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            name: default_target_name(),
            id: String::new(),
            provider_capability: None,
        }
    }
}

fn default_target_name() -> String {
    "app".to_string()
}

/// Shell command templates for platform collaborators.
///
/// Placeholders: `{target}` (target id), `{provider}` (provider identity),
/// `{capability}` (provider capability).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommandsConfig {
    /// Launches the target; `{target}` is substituted
    #[serde(default)]
    pub launch: String,
    /// Regex matched against launch output to detect readiness.
    /// A numeric first capture group is taken as the self-reported duration in ms.
    #[serde(default)]
    pub ready_pattern: Option<String>,
    /// Prints one provider identity per line
    #[serde(default)]
    pub list_providers: Option<String>,
    /// Terminates one provider's background processes
    #[serde(default)]
    pub kill_background: Option<String>,
    /// Force-stops the target (required for cold starts)
    #[serde(default)]
    pub force_stop: Option<String>,
    /// Blocks until the platform is idle
    #[serde(default)]
    pub wait_idle: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Report file (stdout when unset)
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            file: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl LaunchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("invalid {}", path.display()))?;
        Ok(config)
    }

    /// Find `launch.toml` by walking up from the current directory
    pub fn discover() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Parsed per-trial completion timeout
    pub fn timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.runner
            .timeout
            .as_deref()
            .map(Self::parse_duration)
            .transpose()
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# launchbench configuration

[runner]
# Trials per start mode (at least 2)
trials = 10
# Start modes: "cold", "warm" or "both"
mode = "both"
# Fail a trial that does not complete in time (uncomment to enable)
# timeout = "30s"

[target]
# Short name used in metric keys: <name>-cold-start-performance-median
name = "files"
# Platform identity substituted for {target}
id = "com.android.documentsui"
# Providers of this capability are killed before cold starts (uncomment to enable)
# provider_capability = "android.content.action.DOCUMENTS_PROVIDER"

[commands]
# Launch the target
launch = "adb shell am start -W -n {target}/.LauncherActivity"
# Readiness line; a numeric capture group is used as the measured time in ms
ready_pattern = 'TotalTime: (\d+)'
# One provider identity per line (uncomment to enable)
# list_providers = "./scripts/list-providers.sh {capability}"
# Kill one provider's background processes
kill_background = "adb shell am kill {provider}"
# Force-stop the target before cold starts
force_stop = "adb shell am force-stop {target}"
# Wait for the device to settle (uncomment to enable)
# wait_idle = "adb wait-for-device"

[output]
# Output format: human, json
format = "human"
# Write the report to a file instead of stdout (uncomment to enable)
# file = "target/launchbench/report.json"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m")
    pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        let nanos = value * multiplier as f64;
        if !nanos.is_finite() || nanos < 0.0 || nanos > u64::MAX as f64 {
            return Err(anyhow::anyhow!("Duration out of range: {}", s));
        }
        Ok(Duration::from_nanos(nanos.round() as u64))
    }
}
