// crates/scenario-env/src/lib.rs
// ============================================================================
// Module: Scenario Env Library
// Description: Per-scenario environment provisioning for acceptance suites.
// Purpose: Make local executables and libraries reachable and reset scratch output.
// Dependencies: serde, serde_json, serde_jcs, thiserror, toml
// ============================================================================

//! ## Overview
//! `scenario-env` prepares an isolated environment for every scenario of an
//! acceptance suite that drives an external command-line tool. Before each
//! scenario it prepends the project's `bin` directory to the command search
//! path, prepends the project's `lib` directory to the module search path, and
//! wipes and recreates a fixed scratch directory. After each scenario it
//! restores the module search path to the value observed before setup.
//!
//! Environment access goes through an explicit [`EnvStore`] so a suite can
//! choose between the live process environment and an isolated overlay.
//! Scenarios run strictly sequentially; see [`ScenarioRunner`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env_store;
pub mod events;
pub mod provisioner;
pub mod runner;
pub mod scratch;
pub mod search_path;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::ScenarioEnvConfig;
pub use config::ScenarioEnvVar;
pub use env_store::EnvStore;
pub use env_store::MemoryEnv;
pub use env_store::ProcessEnv;
pub use events::LifecycleEvent;
pub use events::LifecycleEventKind;
pub use events::LifecycleSink;
pub use provisioner::CommandOutput;
pub use provisioner::ModulePathSnapshot;
pub use provisioner::ProvisionError;
pub use provisioner::Provisioner;
pub use provisioner::ScenarioContext;
pub use provisioner::ScenarioScope;
pub use runner::RunReport;
pub use runner::RunnerError;
pub use runner::Scenario;
pub use runner::ScenarioHooks;
pub use runner::ScenarioOutcome;
pub use runner::ScenarioRunner;
pub use runner::ScenarioStatus;
pub use scratch::ScratchError;
pub use scratch::reset_scratch_dir;

// ============================================================================
// SECTION: Macros
// ============================================================================

/// Builds a default [`ScenarioEnvConfig`] rooted at the calling crate.
///
/// The project root is the manifest directory of the crate that expands the
/// macro, so `bin` and `lib` resolve relative to the suite's own location
/// rather than the working directory.
#[macro_export]
macro_rules! scenario_config {
    () => {
        $crate::ScenarioEnvConfig::for_project(env!("CARGO_MANIFEST_DIR"))
    };
}
