// crates/scenario-env/src/runner.rs
// ============================================================================
// Module: Scenario Runner
// Description: Sequential scenario execution around registered lifecycle hooks.
// Purpose: Guarantee teardown on every exit path and report scenario outcomes.
// Dependencies: serde, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! A [`ScenarioRunner`] owns one [`ScenarioHooks`] implementation and runs
//! scenarios strictly one after another: setup, body, teardown. Teardown runs
//! whenever setup succeeded, including when the body returns an error or
//! panics. A failed setup skips the body and is reported as
//! [`ScenarioStatus::SetupFailed`]. The per-scenario state saved by setup
//! travels as the hooks' opaque token, never as global state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::fmt::Display;
use std::fs;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::env_store::EnvStore;
use crate::events::LifecycleEvent;
use crate::events::LifecycleEventKind;
use crate::events::LifecycleSink;
use crate::events::NoopSink;
use crate::provisioner::ModulePathSnapshot;
use crate::provisioner::ProvisionError;
use crate::provisioner::Provisioner;

// ============================================================================
// SECTION: Hooks
// ============================================================================

/// Setup and teardown callbacks registered with a [`ScenarioRunner`].
pub trait ScenarioHooks {
    /// Opaque per-scenario value produced by setup and consumed by teardown.
    type Token;
    /// Setup failure.
    type Error: Display;

    /// Prepares the environment for `scenario`.
    ///
    /// # Errors
    ///
    /// Returns an error when the scenario cannot run; its body is skipped.
    fn before(&mut self, scenario: &str) -> Result<Self::Token, Self::Error>;

    /// Restores the environment after `scenario`. Always called after a
    /// successful [`Self::before`].
    fn after(&mut self, scenario: &str, token: Self::Token);
}

impl<E: EnvStore> ScenarioHooks for Provisioner<E> {
    type Token = ModulePathSnapshot;
    type Error = ProvisionError;

    fn before(&mut self, scenario: &str) -> Result<Self::Token, Self::Error> {
        self.set_scenario(Some(scenario));
        self.setup()
    }

    fn after(&mut self, _scenario: &str, token: Self::Token) {
        self.teardown(token);
        self.set_scenario(None);
    }
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// Scenario body; receives the hooks so it can reach their context.
pub type ScenarioBody<H> = Box<dyn FnOnce(&H) -> Result<(), String>>;

/// A named scenario.
pub struct Scenario<H> {
    /// Scenario name.
    name: String,
    /// Scenario body.
    body: ScenarioBody<H>,
}

impl<H> Scenario<H> {
    /// Creates a scenario from a name and body.
    pub fn new(
        name: impl Into<String>,
        body: impl FnOnce(&H) -> Result<(), String> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    /// Returns the scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Scenario result classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Body completed successfully.
    Passed,
    /// Body returned an error or panicked.
    Failed,
    /// Setup failed; body skipped.
    SetupFailed,
}

impl ScenarioStatus {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::SetupFailed => "setup_failed",
        }
    }
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario name.
    pub name: String,
    /// Result classification.
    pub status: ScenarioStatus,
    /// Failure message, if any.
    pub message: Option<String>,
    /// Wall-clock duration of setup, body, and teardown.
    pub duration_ms: u64,
}

/// Report of a full run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Outcomes in execution order.
    pub scenarios: Vec<ScenarioOutcome>,
}

impl RunReport {
    /// Returns the number of passed scenarios.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(ScenarioStatus::Passed)
    }

    /// Returns the number of scenarios that failed or could not be set up.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.scenarios.len() - self.passed()
    }

    /// Returns true when every scenario passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Counts outcomes with `status`.
    fn count(&self, status: ScenarioStatus) -> usize {
        self.scenarios.iter().filter(|outcome| outcome.status == status).count()
    }

    /// Writes the report as canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when serialization or the write fails.
    pub fn write_json(&self, path: &Path) -> Result<(), RunnerError> {
        let bytes =
            serde_jcs::to_vec(self).map_err(|err| RunnerError::Serialize(err.to_string()))?;
        fs::write(path, bytes).map_err(RunnerError::Io)
    }
}

/// Run report persistence failures.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Report serialization failed.
    #[error("report serialization failed: {0}")]
    Serialize(String),
    /// Report write failed.
    #[error("report write failed: {0}")]
    Io(#[source] io::Error),
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs scenarios sequentially around registered hooks.
pub struct ScenarioRunner<H: ScenarioHooks> {
    /// Registered hooks.
    hooks: H,
    /// Destination for lifecycle events.
    sink: Arc<dyn LifecycleSink>,
}

impl<H: ScenarioHooks> ScenarioRunner<H> {
    /// Registers `hooks` with a new runner.
    #[must_use]
    pub fn new(hooks: H) -> Self {
        Self {
            hooks,
            sink: Arc::new(NoopSink),
        }
    }

    /// Returns the runner with a lifecycle event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LifecycleSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the registered hooks.
    #[must_use]
    pub const fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Consumes the runner and returns the registered hooks.
    #[must_use]
    pub fn into_hooks(self) -> H {
        self.hooks
    }

    /// Runs `scenarios` in order and returns their outcomes.
    pub fn run(&mut self, scenarios: Vec<Scenario<H>>) -> RunReport {
        let mut report = RunReport::default();
        for scenario in scenarios {
            report.scenarios.push(self.run_one(scenario));
        }
        report
    }

    /// Runs a single scenario through setup, body, and teardown.
    pub fn run_one(&mut self, scenario: Scenario<H>) -> ScenarioOutcome {
        let Scenario {
            name,
            body,
        } = scenario;
        let started = Instant::now();
        self.sink.record(
            &LifecycleEvent::new(LifecycleEventKind::ScenarioStarted).scenario(Some(&name)),
        );

        let (status, message) = match self.hooks.before(&name) {
            Err(err) => (ScenarioStatus::SetupFailed, Some(err.to_string())),
            Ok(token) => {
                let hooks = &self.hooks;
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| body(hooks)));
                self.hooks.after(&name, token);
                match result {
                    Ok(Ok(())) => (ScenarioStatus::Passed, None),
                    Ok(Err(message)) => (ScenarioStatus::Failed, Some(message)),
                    Err(payload) => (ScenarioStatus::Failed, Some(panic_message(payload.as_ref()))),
                }
            }
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut event = LifecycleEvent::new(LifecycleEventKind::ScenarioFinished)
            .scenario(Some(&name))
            .field("status", status.as_str());
        if let Some(message) = &message {
            event = event.field("message", message.clone());
        }
        self.sink.record(&event);

        ScenarioOutcome {
            name,
            status,
            message,
            duration_ms,
        }
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return format!("panicked: {message}");
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return format!("panicked: {message}");
    }
    "panicked".to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
