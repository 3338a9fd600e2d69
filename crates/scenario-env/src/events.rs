// crates/scenario-env/src/events.rs
// ============================================================================
// Module: Lifecycle Events
// Description: Structured lifecycle events for scenario provisioning.
// Purpose: Emit JSON-line events without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Provisioning and runner steps emit [`LifecycleEvent`] values to a
//! [`LifecycleSink`]. Sinks serialize events as JSON lines to stderr or an
//! append-only file, drop them, or keep them in memory for assertions.
//! Sink failures never affect scenario outcomes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::config::ScenarioEnvConfig;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle event identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    /// The executable directory was prepended to the command search path.
    SearchPathPrepared,
    /// The module search path was overridden for a scenario.
    ModulePathOverridden,
    /// The module search path was restored after a scenario.
    ModulePathRestored,
    /// The scratch directory was wiped and recreated.
    ScratchReset,
    /// Scenario setup failed.
    SetupFailed,
    /// A scenario started.
    ScenarioStarted,
    /// A scenario finished.
    ScenarioFinished,
    /// Captured output of a command run inside a scenario.
    CommandOutput,
}

/// Lifecycle event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    /// Event identifier.
    pub event: LifecycleEventKind,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Scenario name when the event belongs to one.
    pub scenario: Option<String>,
    /// Event-specific fields.
    pub fields: BTreeMap<&'static str, String>,
}

impl LifecycleEvent {
    /// Creates a new event with a consistent timestamp.
    #[must_use]
    pub fn new(event: LifecycleEventKind) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            scenario: None,
            fields: BTreeMap::new(),
        }
    }

    /// Tags the event with a scenario name.
    #[must_use]
    pub fn scenario(mut self, name: Option<&str>) -> Self {
        self.scenario = name.map(ToString::to_string);
        self
    }

    /// Adds a field to the event.
    #[must_use]
    pub fn field(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.insert(key, value.into());
        self
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for lifecycle events.
pub trait LifecycleSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &LifecycleEvent);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that logs JSON lines to stderr.
pub struct StderrSink;

impl LifecycleSink for StderrSink {
    fn record(&self, event: &LifecycleEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that logs JSON lines to a file.
pub struct FileSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LifecycleSink for FileSink {
    fn record(&self, event: &LifecycleEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op sink.
pub struct NoopSink;

impl LifecycleSink for NoopSink {
    fn record(&self, _event: &LifecycleEvent) {}
}

/// Sink that keeps events in memory.
#[derive(Default)]
pub struct MemorySink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<LifecycleEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().map_or_else(|poisoned| poisoned.into_inner().clone(), |events| {
            events.clone()
        })
    }

    /// Returns the kinds of the recorded events in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<LifecycleEventKind> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl LifecycleSink for MemorySink {
    fn record(&self, event: &LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the sink selected by configuration.
///
/// An `event_log` path selects [`FileSink`]; otherwise `verbose` selects
/// [`StderrSink`] and the default is [`NoopSink`].
///
/// # Errors
///
/// Returns an error when the event log file cannot be opened.
pub fn sink_from_config(
    config: &ScenarioEnvConfig,
    verbose: bool,
) -> io::Result<Arc<dyn LifecycleSink>> {
    if let Some(path) = &config.event_log {
        return Ok(Arc::new(FileSink::new(path)?));
    }
    if verbose {
        return Ok(Arc::new(StderrSink));
    }
    Ok(Arc::new(NoopSink))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
