// crates/scenario-env/src/provisioner.rs
// ============================================================================
// Module: Scenario Environment Provisioner
// Description: Per-scenario setup and teardown of search paths and scratch output.
// Purpose: Make local bin/lib reachable and give each scenario a pristine scratch dir.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! [`Provisioner::setup`] prepends the executable directory to the command
//! search path once, saves the module search path, prepends the library
//! directory to it, and wipes the scratch directory. The saved value is
//! returned as an opaque [`ModulePathSnapshot`] that
//! [`Provisioner::teardown`] consumes to restore the variable, including
//! restoring it to unset.
//!
//! When the scratch reset fails, setup restores the module search path before
//! returning the error, so no exit path leaves the override in place.
//! Teardown never touches the scratch directory; the last scenario's output
//! stays on disk for inspection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsStr;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ScenarioEnvConfig;
use crate::env_store::EnvStore;
use crate::events::LifecycleEvent;
use crate::events::LifecycleEventKind;
use crate::events::LifecycleSink;
use crate::events::NoopSink;
use crate::scratch::ScratchError;
use crate::scratch::reset_scratch_dir;
use crate::search_path::prepend_entry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Provisioning failures.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Scratch directory reset failed.
    #[error(transparent)]
    Scratch(#[from] ScratchError),
    /// A command could not be started inside the scenario.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Module search path value observed before a scenario's setup.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "pass the snapshot to teardown to restore the module search path"]
pub struct ModulePathSnapshot {
    /// Prior value; `None` when the variable was unset.
    previous: Option<OsString>,
}

impl ModulePathSnapshot {
    /// Returns the prior value, if the variable was set.
    #[must_use]
    pub fn previous(&self) -> Option<&OsStr> {
        self.previous.as_deref()
    }
}

// ============================================================================
// SECTION: Provisioner
// ============================================================================

/// Provisions the environment of each scenario through an [`EnvStore`].
pub struct Provisioner<E: EnvStore> {
    /// Resolved configuration.
    config: ScenarioEnvConfig,
    /// Environment the scenario observes.
    env: E,
    /// Destination for lifecycle events.
    sink: Arc<dyn LifecycleSink>,
    /// Whether the command search path has already been prepended.
    search_path_prepared: bool,
    /// Scenario currently being provisioned, used to tag events.
    current: Option<String>,
}

impl<E: EnvStore> Provisioner<E> {
    /// Creates a provisioner that drops lifecycle events.
    #[must_use]
    pub fn new(config: ScenarioEnvConfig, env: E) -> Self {
        Self {
            config,
            env,
            sink: Arc::new(NoopSink),
            search_path_prepared: false,
            current: None,
        }
    }

    /// Returns the provisioner with a lifecycle event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LifecycleSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ScenarioEnvConfig {
        &self.config
    }

    /// Returns the environment store.
    #[must_use]
    pub const fn env(&self) -> &E {
        &self.env
    }

    /// Consumes the provisioner and returns its environment store.
    #[must_use]
    pub fn into_env(self) -> E {
        self.env
    }

    /// Names the scenario that subsequent lifecycle events belong to.
    pub fn set_scenario(&mut self, name: Option<&str>) {
        self.current = name.map(ToString::to_string);
    }

    /// Prepends the executable directory to the command search path.
    ///
    /// Only the first call mutates the environment; the search path is never
    /// restored.
    pub fn prepare_search_path(&mut self) {
        if self.search_path_prepared {
            return;
        }
        let previous = self.env.get(&self.config.path_var);
        let value = prepend_entry(&self.config.bin_dir, previous.as_deref());
        self.env.set(&self.config.path_var, &value);
        self.search_path_prepared = true;
        self.emit(
            LifecycleEvent::new(LifecycleEventKind::SearchPathPrepared)
                .field("var", self.config.path_var.clone())
                .field("dir", self.config.bin_dir.display().to_string()),
        );
    }

    /// Runs scenario setup and returns the snapshot teardown needs.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Scratch`] when the scratch directory cannot
    /// be cleared or recreated. The module search path is already restored
    /// when this error is returned.
    pub fn setup(&mut self) -> Result<ModulePathSnapshot, ProvisionError> {
        self.prepare_search_path();

        let previous = self.env.get(&self.config.module_path_var);
        let value = prepend_entry(&self.config.lib_dir, previous.as_deref());
        self.env.set(&self.config.module_path_var, &value);
        self.emit(
            LifecycleEvent::new(LifecycleEventKind::ModulePathOverridden)
                .field("var", self.config.module_path_var.clone())
                .field("value", value.to_string_lossy()),
        );
        let snapshot = ModulePathSnapshot {
            previous,
        };

        if let Err(err) = reset_scratch_dir(&self.config.scratch_dir) {
            self.emit(
                LifecycleEvent::new(LifecycleEventKind::SetupFailed).field("error", err.to_string()),
            );
            self.teardown(snapshot);
            return Err(err.into());
        }
        self.emit(
            LifecycleEvent::new(LifecycleEventKind::ScratchReset)
                .field("dir", self.config.scratch_dir.display().to_string()),
        );
        Ok(snapshot)
    }

    /// Restores the module search path saved by [`Self::setup`].
    pub fn teardown(&mut self, snapshot: ModulePathSnapshot) {
        self.env.restore(&self.config.module_path_var, snapshot.previous.as_deref());
        self.emit(
            LifecycleEvent::new(LifecycleEventKind::ModulePathRestored)
                .field("var", self.config.module_path_var.clone())
                .field("set", snapshot.previous.is_some().to_string()),
        );
    }

    /// Runs setup and returns a guard that tears down when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when setup fails.
    pub fn enter(&mut self) -> Result<ScenarioScope<'_, E>, ProvisionError> {
        let snapshot = self.setup()?;
        Ok(ScenarioScope {
            provisioner: self,
            snapshot: Some(snapshot),
        })
    }

    /// Returns the context a scenario body works against.
    #[must_use]
    pub fn context(&self) -> ScenarioContext<'_> {
        ScenarioContext {
            config: &self.config,
            env: &self.env,
            sink: self.sink.as_ref(),
            scenario: self.current.as_deref(),
        }
    }

    /// Records an event tagged with the current scenario.
    fn emit(&self, event: LifecycleEvent) {
        self.sink.record(&event.scenario(self.current.as_deref()));
    }
}

// ============================================================================
// SECTION: Scope Guard
// ============================================================================

/// Provisioned scenario; restores the module search path when dropped.
pub struct ScenarioScope<'a, E: EnvStore> {
    /// Provisioner that ran setup.
    provisioner: &'a mut Provisioner<E>,
    /// Snapshot pending restoration.
    snapshot: Option<ModulePathSnapshot>,
}

impl<E: EnvStore> ScenarioScope<'_, E> {
    /// Returns the scenario context.
    #[must_use]
    pub fn context(&self) -> ScenarioContext<'_> {
        self.provisioner.context()
    }

    /// Tears the scenario down now.
    pub fn finish(mut self) {
        self.restore();
    }

    /// Restores the snapshot once.
    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.provisioner.teardown(snapshot);
        }
    }
}

impl<E: EnvStore> Drop for ScenarioScope<'_, E> {
    fn drop(&mut self) {
        self.restore();
    }
}

// ============================================================================
// SECTION: Scenario Context
// ============================================================================

/// Captured output of a command run inside a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status_code: Option<i32>,
    /// Captured stdout (lossy UTF-8).
    pub stdout: String,
    /// Captured stderr (lossy UTF-8).
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true when the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status_code, Some(0))
    }
}

/// Read-only view of a provisioned scenario.
#[derive(Clone, Copy)]
pub struct ScenarioContext<'a> {
    /// Resolved configuration.
    config: &'a ScenarioEnvConfig,
    /// Environment the scenario observes.
    env: &'a dyn EnvStore,
    /// Destination for lifecycle events.
    sink: &'a dyn LifecycleSink,
    /// Current scenario name.
    scenario: Option<&'a str>,
}

impl<'a> ScenarioContext<'a> {
    /// Returns the scratch directory.
    #[must_use]
    pub fn scratch_dir(&self) -> &'a Path {
        &self.config.scratch_dir
    }

    /// Returns the executable directory.
    #[must_use]
    pub fn bin_dir(&self) -> &'a Path {
        &self.config.bin_dir
    }

    /// Returns the library directory.
    #[must_use]
    pub fn lib_dir(&self) -> &'a Path {
        &self.config.lib_dir
    }

    /// Returns the current scenario name.
    #[must_use]
    pub const fn scenario(&self) -> Option<&'a str> {
        self.scenario
    }

    /// Returns the value a subprocess would observe for `key`.
    #[must_use]
    pub fn var(&self, key: &str) -> Option<OsString> {
        self.env.get(key)
    }

    /// Returns the command search path the scenario observes.
    #[must_use]
    pub fn search_path(&self) -> Option<OsString> {
        self.env.get(&self.config.path_var)
    }

    /// Returns the module search path the scenario observes.
    #[must_use]
    pub fn module_path(&self) -> Option<OsString> {
        self.env.get(&self.config.module_path_var)
    }

    /// Builds a command with the managed variables applied from the store.
    pub fn command(&self, program: impl AsRef<OsStr>) -> Command {
        let mut command = Command::new(program);
        for key in [&self.config.path_var, &self.config.module_path_var] {
            match self.env.get(key) {
                Some(value) => command.env(key, value),
                None => command.env_remove(key),
            };
        }
        command
    }

    /// Runs `program` with `args` and captures its output.
    ///
    /// In announce mode the captured output is recorded as a
    /// `command_output` lifecycle event.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Spawn`] when the program cannot be started.
    pub fn run<I, S>(&self, program: &str, args: I) -> Result<CommandOutput, ProvisionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.command(program).args(args).output().map_err(|source| {
            ProvisionError::Spawn {
                program: program.to_string(),
                source,
            }
        })?;
        let result = CommandOutput {
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if self.config.announce {
            let status =
                result.status_code.map_or_else(|| "signal".to_string(), |code| code.to_string());
            self.sink.record(
                &LifecycleEvent::new(LifecycleEventKind::CommandOutput)
                    .scenario(self.scenario)
                    .field("program", program)
                    .field("status", status)
                    .field("stdout", result.stdout.clone())
                    .field("stderr", result.stderr.clone()),
            );
        }
        Ok(result)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
