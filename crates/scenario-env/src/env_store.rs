// crates/scenario-env/src/env_store.rs
// ============================================================================
// Module: Environment Stores
// Description: Explicit context objects for reading and writing env vars.
// Purpose: Route environment mutation through one seam instead of ambient state.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`EnvStore`] is the seam through which provisioning reads and writes
//! environment variables. [`ProcessEnv`] targets the live process environment
//! and is only sound under strictly sequential scenario execution.
//! [`MemoryEnv`] is an isolated overlay whose values are applied to spawned
//! commands explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::ffi::OsString;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Read/write access to a set of environment variables.
///
/// Writes are infallible; a missing value is represented as `None`.
pub trait EnvStore {
    /// Returns the current value for `key`, if set.
    fn get(&self, key: &str) -> Option<OsString>;

    /// Sets `key` to `value`.
    fn set(&mut self, key: &str, value: &OsStr);

    /// Removes `key`; removing an unset key is a no-op.
    fn remove(&mut self, key: &str);

    /// Restores `key` to a previously observed value, removing it when absent.
    fn restore(&mut self, key: &str, previous: Option<&OsStr>) {
        match previous {
            Some(value) => self.set(key, value),
            None => self.remove(key),
        }
    }
}

// ============================================================================
// SECTION: Process Environment
// ============================================================================

/// The live process environment.
///
/// Mutation is only sound while no other thread reads or writes the process
/// environment. Scenario execution is strictly sequential, which upholds this
/// for the lifetime of a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn set(&mut self, key: &str, value: &OsStr) {
        process_mut::set_var(key, value);
    }

    fn remove(&mut self, key: &str) {
        process_mut::remove_var(key);
    }
}

/// Unsafe wrappers around process environment mutation.
mod process_mut {
    #![allow(unsafe_code, reason = "Scenario provisioning mutates process env between scenarios.")]

    use std::ffi::OsStr;

    /// Sets an environment variable for the current process.
    pub fn set_var(key: &str, value: &OsStr) {
        // SAFETY: Scenarios execute sequentially; no concurrent env access occurs.
        unsafe {
            std::env::set_var(key, value);
        }
    }

    /// Removes an environment variable from the current process.
    pub fn remove_var(key: &str) {
        // SAFETY: Scenarios execute sequentially; no concurrent env access occurs.
        unsafe {
            std::env::remove_var(key);
        }
    }
}

// ============================================================================
// SECTION: Memory Environment
// ============================================================================

/// An isolated in-memory environment overlay.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryEnv {
    /// Variables currently set in the overlay.
    vars: BTreeMap<String, OsString>,
}

impl MemoryEnv {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an overlay seeded with the current process values of `keys`.
    #[must_use]
    pub fn from_process(keys: &[&str]) -> Self {
        let vars = keys
            .iter()
            .filter_map(|key| std::env::var_os(key).map(|value| ((*key).to_string(), value)))
            .collect();
        Self {
            vars,
        }
    }

    /// Returns the overlay with `key` set to `value`.
    #[must_use]
    pub fn with_var(mut self, key: &str, value: impl AsRef<OsStr>) -> Self {
        self.vars.insert(key.to_string(), value.as_ref().to_os_string());
        self
    }

    /// Iterates over the variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OsStr)> {
        self.vars.iter().map(|(key, value)| (key.as_str(), value.as_os_str()))
    }
}

impl EnvStore for MemoryEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &OsStr) {
        self.vars.insert(key.to_string(), value.to_os_string());
    }

    fn remove(&mut self, key: &str) {
        self.vars.remove(key);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
