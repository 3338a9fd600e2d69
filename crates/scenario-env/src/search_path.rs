// crates/scenario-env/src/search_path.rs
// ============================================================================
// Module: Search Path Composition
// Description: Prepend directories to separator-joined search path values.
// Purpose: Compose PATH-style values exactly as subprocesses will read them.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Search path values are composed by plain concatenation:
//! `<dir><separator><previous>`. An absent previous value contributes the
//! empty string, so prepending to an unset variable yields `<dir><separator>`.
//! Prepending never de-duplicates; repeated prepends only add harmless
//! duplicate entries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsStr;
use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Platform separator between search path entries.
pub const PATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };
/// Separator as a string slice for `OsString` composition.
const SEPARATOR_STR: &str = if cfg!(windows) { ";" } else { ":" };

// ============================================================================
// SECTION: Composition
// ============================================================================

/// Returns `<dir><separator><previous>`, treating an absent previous value as empty.
#[must_use]
pub fn prepend_entry(dir: &Path, previous: Option<&OsStr>) -> OsString {
    let mut value = OsString::from(dir.as_os_str());
    value.push(SEPARATOR_STR);
    if let Some(previous) = previous {
        value.push(previous);
    }
    value
}

/// Returns true when `value` begins with `dir` followed by the separator.
#[must_use]
pub fn starts_with_entry(value: &OsStr, dir: &Path) -> bool {
    let expected = prepend_entry(dir, None);
    value.as_encoded_bytes().starts_with(expected.as_encoded_bytes())
}

/// Splits a search path value into its entries the way the platform parses it.
///
/// Empty entries are kept, so `entries("<dir>:")` yields `<dir>` and `""`.
#[must_use]
pub fn entries(value: &OsStr) -> Vec<PathBuf> {
    std::env::split_paths(value).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
