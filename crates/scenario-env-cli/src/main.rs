// crates/scenario-env-cli/src/main.rs
// ============================================================================
// Module: Scenario Env CLI Entry Point
// Description: Command dispatcher for scenario environment provisioning.
// Purpose: Reset scratch output, inspect config, and run commands in a scenario.
// Dependencies: clap, scenario-env, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The `scenario-env` CLI exposes the provisioner outside a test harness:
//! it prints the resolved configuration, resets the scratch directory, shows
//! the search paths a scenario observes, and executes a single command inside
//! one provisioned scenario. Provisioning for `env` and `exec` runs against an
//! in-memory overlay seeded from the process, so the CLI never mutates its
//! own environment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use scenario_env::MemoryEnv;
use scenario_env::Provisioner;
use scenario_env::ScenarioEnvConfig;
use scenario_env::events::sink_from_config;
use scenario_env::reset_scratch_dir;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "scenario-env", version, about = "Provision per-scenario test environments")]
struct Cli {
    /// Emit lifecycle events to stderr as JSON lines.
    #[arg(long, global = true)]
    verbose: bool,
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command set.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved configuration as JSON.
    Config(ConfigArgs),
    /// Wipe and recreate the scratch directory.
    Reset(ConfigArgs),
    /// Print the search paths a provisioned scenario observes.
    Env(ConfigArgs),
    /// Run a command inside one provisioned scenario.
    Exec(ExecCommand),
}

/// Configuration selection shared by all commands.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to a scenario-env.toml file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Project root that bin/lib resolve against (defaults to the working directory).
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

/// Arguments for `exec`.
#[derive(Args, Debug)]
struct ExecCommand {
    /// Configuration selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Program and arguments, after `--`.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    command: Vec<OsString>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Config(args) => command_config(&args),
        Commands::Reset(args) => command_reset(&args),
        Commands::Env(args) => command_env(&args, cli.verbose),
        Commands::Exec(command) => command_exec(command, cli.verbose),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Prints the resolved configuration.
fn command_config(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let rendered = serde_json::to_string_pretty(&config)
        .map_err(|err| CliError::new(format!("Failed to render config: {err}")))?;
    write_stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

/// Resets the scratch directory.
fn command_reset(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    reset_scratch_dir(&config.scratch_dir).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&format!("Scratch directory reset: {}", config.scratch_dir.display()))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the provisioned search paths.
fn command_env(args: &ConfigArgs, verbose: bool) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let path_var = config.path_var.clone();
    let module_path_var = config.module_path_var.clone();
    let mut provisioner = provisioner(config, verbose)?;
    let scope = provisioner.enter().map_err(|err| CliError::new(err.to_string()))?;
    let context = scope.context();
    let search_path = context.search_path().unwrap_or_default();
    let module_path = context.module_path().unwrap_or_default();
    write_stdout_line(&format!("{path_var}={}", search_path.to_string_lossy()))?;
    write_stdout_line(&format!("{module_path_var}={}", module_path.to_string_lossy()))?;
    write_stdout_line(&format!("SCRATCH_DIR={}", context.scratch_dir().display()))?;
    scope.finish();
    Ok(ExitCode::SUCCESS)
}

/// Runs a command inside one provisioned scenario.
fn command_exec(command: ExecCommand, verbose: bool) -> CliResult<ExitCode> {
    let mut parts = command.command.into_iter();
    let program = parts.next().ok_or_else(|| CliError::new("exec requires a command"))?;
    let mut provisioner = provisioner(load_config(&command.config)?, verbose)?;
    let scope = provisioner.enter().map_err(|err| CliError::new(err.to_string()))?;
    let status = scope.context().command(&program).args(parts).status().map_err(|err| {
        CliError::new(format!("Failed to run {}: {err}", program.to_string_lossy()))
    })?;
    scope.finish();
    let code = status.code().and_then(|code| u8::try_from(code).ok());
    Ok(code.map_or(ExitCode::FAILURE, ExitCode::from))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration rooted at `--root` or the working directory.
///
/// A relative `--root` is joined onto the working directory so provisioned
/// search path entries are always absolute.
fn load_config(args: &ConfigArgs) -> CliResult<ScenarioEnvConfig> {
    let cwd = std::env::current_dir()
        .map_err(|err| CliError::new(format!("Failed to read working directory: {err}")))?;
    let root = args.root.as_ref().map_or_else(|| cwd.clone(), |root| cwd.join(root));
    ScenarioEnvConfig::load(args.config.as_deref(), &root)
        .map_err(|err| CliError::new(format!("Failed to load config: {err}")))
}

/// Builds a provisioner over an overlay seeded from the managed process variables.
fn provisioner(config: ScenarioEnvConfig, verbose: bool) -> CliResult<Provisioner<MemoryEnv>> {
    let sink = sink_from_config(&config, verbose)
        .map_err(|err| CliError::new(format!("Failed to open event log: {err}")))?;
    let env = MemoryEnv::from_process(&[config.path_var.as_str(), config.module_path_var.as_str()]);
    Ok(Provisioner::new(config, env).with_sink(sink))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("Failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
