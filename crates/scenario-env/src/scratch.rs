// crates/scenario-env/src/scratch.rs
// ============================================================================
// Module: Scratch Directory
// Description: Wipe-and-recreate handling for the per-scenario output directory.
// Purpose: Give every scenario a pristine, empty scratch directory.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! The scratch directory is removed recursively and recreated empty. A missing
//! directory is the only tolerated failure; every other filesystem error is
//! returned with the underlying [`io::Error`] as its source. No retry is
//! attempted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scratch directory reset failures.
#[derive(Debug, Error)]
pub enum ScratchError {
    /// Removing the existing directory failed.
    #[error("failed to clear scratch directory {}: {source}", path.display())]
    Clear {
        /// Scratch directory path.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// Creating the fresh directory failed.
    #[error("failed to create scratch directory {}: {source}", path.display())]
    Create {
        /// Scratch directory path.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
}

impl ScratchError {
    /// Returns the underlying filesystem error kind.
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Clear {
                source, ..
            }
            | Self::Create {
                source, ..
            } => source.kind(),
        }
    }
}

// ============================================================================
// SECTION: Reset
// ============================================================================

/// Removes `path` recursively if present, then recreates it empty.
///
/// # Errors
///
/// Returns [`ScratchError::Clear`] when removal fails for any reason other
/// than the directory not existing (including when `path` is not a
/// directory), and [`ScratchError::Create`] when recreation fails.
pub fn reset_scratch_dir(path: &Path) -> Result<(), ScratchError> {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ScratchError::Clear {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    fs::create_dir_all(path).map_err(|source| ScratchError::Create {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns the number of entries directly inside `path`.
///
/// # Errors
///
/// Returns an error when the directory cannot be read.
pub fn entry_count(path: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(path)? {
        entry?;
        count += 1;
    }
    Ok(count)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
