#![warn(missing_docs)]
//! launchbench CLI Library
//!
//! Command-line front-end that benchmarks application startup through
//! configured shell commands. Use `launchbench_cli::run()` from a binary's
//! `main` to get the full CLI.
//!
//! # Example
//!
//! ```ignore
//! fn main() {
//!     if let Err(e) = launchbench_cli::run() {
//!         eprintln!("launchbench: {e:#}");
//!         std::process::exit(1);
//!     }
//! }
//! ```

mod config;
mod shell;

pub use config::*;
pub use shell::{ShellLaunchAction, ShellPlatform, expand};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use launchbench_core::{
    BenchmarkHarness, ForceStopResetPolicy, MIN_SAMPLE_COUNT, NullResetPolicy, Platform,
    ResetPolicy, StartMode,
};
use launchbench_report::{
    BenchmarkReport, LogSink, OutputFormat, ReportMeta, RunReport, format_human_output,
    generate_json_report,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// launchbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "launchbench")]
#[command(author, version, about = "launchbench - cold and warm startup benchmarks")]
pub struct Cli {
    /// Optional subcommand (Run, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to the nearest launch.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Start modes to benchmark
    #[arg(long, value_enum, global = true)]
    pub mode: Option<ModeSelection>,

    /// Trials per start mode
    #[arg(short = 'n', long, global = true)]
    pub trials: Option<usize>,

    /// Per-trial completion timeout (e.g. "30s", "500ms")
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Output format: human, json
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the configured benchmarks (default)
    Run,
    /// Print a commented default launch.toml
    Init,
}

/// Run the launchbench CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` when every benchmark run succeeded.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the launchbench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    if matches!(cli.command, Some(Commands::Init)) {
        print!("{}", LaunchConfig::default_toml());
        return Ok(());
    }

    // Logs go to stderr so stdout stays clean for the report
    let filter = if cli.verbose {
        "launchbench=debug"
    } else {
        "launchbench=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let settings = RunSettings::resolve(&cli, &config)?;
    run_benchmarks(&config, &settings)
}

/// Explicit `--config`, else discovered launch.toml, else defaults
fn load_config(cli: &Cli) -> anyhow::Result<LaunchConfig> {
    let path = cli.config.clone().or_else(LaunchConfig::discover);
    match path {
        Some(path) => {
            info!(config = %path.display(), "loading configuration");
            LaunchConfig::load(&path)
        }
        None => Ok(LaunchConfig::default()),
    }
}

/// Effective settings after layering CLI flags over launch.toml
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Name used in metric keys
    pub target_name: String,
    /// Platform identity of the target
    pub target_id: String,
    /// Capability whose providers are killed before cold starts
    pub provider_capability: Option<String>,
    /// Start modes in execution order
    pub modes: Vec<StartMode>,
    /// Trials per mode
    pub trials: usize,
    /// Per-trial completion timeout
    pub timeout: Option<Duration>,
    /// Report format
    pub format: OutputFormat,
    /// Report destination (stdout when `None`)
    pub output: Option<PathBuf>,
}

impl RunSettings {
    /// Resolve settings; CLI flags win over configuration values
    pub fn resolve(cli: &Cli, config: &LaunchConfig) -> anyhow::Result<Self> {
        let modes = cli.mode.unwrap_or(config.runner.mode).modes();
        let trials = cli.trials.unwrap_or(config.runner.trials);

        let timeout = match cli.timeout.as_deref() {
            Some(s) => Some(LaunchConfig::parse_duration(s).context("invalid --timeout")?),
            None => config.timeout().context("invalid runner.timeout")?,
        };

        let format_str = cli.format.as_deref().unwrap_or(&config.output.format);
        let format: OutputFormat = format_str.parse().map_err(anyhow::Error::msg)?;

        let output = cli
            .output
            .clone()
            .or_else(|| config.output.file.as_ref().map(PathBuf::from));

        if trials < MIN_SAMPLE_COUNT {
            anyhow::bail!(
                "at least {} trials per mode are needed to report a median (got {})",
                MIN_SAMPLE_COUNT,
                trials
            );
        }
        if config.commands.launch.trim().is_empty() {
            anyhow::bail!("no launch command configured (set commands.launch in launch.toml)");
        }
        if modes.contains(&StartMode::Cold) && config.commands.force_stop.is_none() {
            anyhow::bail!(
                "cold starts need commands.force_stop; configure it or pass --mode warm"
            );
        }

        Ok(Self {
            target_name: config.target.name.clone(),
            target_id: config.target.id.clone(),
            provider_capability: config.target.provider_capability.clone(),
            modes,
            trials,
            timeout,
            format,
            output,
        })
    }

    /// Reset policy for trials in `mode`
    fn reset_policy(&self, mode: StartMode, config: &LaunchConfig) -> Box<dyn ResetPolicy> {
        if !mode.resets_environment() {
            return Box::new(NullResetPolicy);
        }
        let platform = ShellPlatform::from_config(&config.commands);
        let mut policy = ForceStopResetPolicy::new(platform, self.target_id.clone());
        if let Some(capability) = &self.provider_capability {
            policy = policy.with_capability(capability.clone());
        }
        Box::new(policy)
    }

    /// Harness for `mode`; every launch is preceded by exactly one idle wait.
    ///
    /// Cold resets already end by waiting for idle, so only warm trials get
    /// a separate settle step.
    fn build_harness(
        &self,
        mode: StartMode,
        config: &LaunchConfig,
    ) -> BenchmarkHarness<Box<dyn ResetPolicy>> {
        let mut harness = BenchmarkHarness::new(self.target_name.clone())
            .with_reset_policy(self.reset_policy(mode, config))
            .with_timeout(self.timeout);
        if !mode.resets_environment() {
            let platform = ShellPlatform::from_config(&config.commands);
            harness = harness.with_settle(move || platform.wait_for_idle());
        }
        harness
    }
}

fn progress_bar(trials: usize, mode: StartMode) -> ProgressBar {
    let pb = ProgressBar::new(trials as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(format!("{mode} start"));
    pb
}

fn run_benchmarks(config: &LaunchConfig, settings: &RunSettings) -> anyhow::Result<()> {
    let mut action = ShellLaunchAction::from_config(&config.commands, &settings.target_id)
        .context("invalid commands.ready_pattern")?;

    let mut results: Vec<BenchmarkReport> = Vec::with_capacity(settings.modes.len());
    let mut failures = 0usize;

    for &mode in &settings.modes {
        let pb = progress_bar(settings.trials, mode);
        let observer = pb.clone();

        let mut harness = settings.build_harness(mode, config).on_trial(move |trial| {
            observer.set_message(format!(
                "{mode} start: {:.1}ms",
                trial.duration.as_secs_f64() * 1000.0
            ));
            observer.inc(1);
        });

        match harness.run(settings.trials, mode, &mut action) {
            Ok(report) => {
                pb.finish_with_message(format!("{mode} start complete"));
                report.emit(&mut LogSink);
                results.push(report);
            }
            Err(e) => {
                pb.abandon_with_message(format!("{mode} start failed"));
                error!(%mode, error = %e, "benchmark run failed");
                failures += 1;
            }
        }
    }

    let report = RunReport {
        meta: ReportMeta::new(settings.target_id.clone(), settings.trials, settings.timeout),
        results,
    };
    write_report(&report, settings)?;

    if failures > 0 {
        anyhow::bail!("{} of {} benchmark runs failed", failures, settings.modes.len());
    }
    Ok(())
}

fn write_report(report: &RunReport, settings: &RunSettings) -> anyhow::Result<()> {
    let rendered = match settings.format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Human => format_human_output(report),
    };

    match &settings.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
