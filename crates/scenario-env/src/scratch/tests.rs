// crates/scenario-env/src/scratch/tests.rs
// ============================================================================
// Module: Scratch Directory Tests
// Description: Unit tests for scratch directory reset.
// Purpose: Ensure reset is idempotent and fails closed on non-directories.
// Dependencies: scenario-env, tempfile
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::fs;

use super::ScratchError;
use super::entry_count;
use super::reset_scratch_dir;

#[test]
fn reset_creates_missing_directory() {
    let root = tempfile::tempdir().expect("tempdir");
    let scratch = root.path().join("vpnconfig");

    reset_scratch_dir(&scratch).expect("reset");

    assert!(scratch.is_dir());
    assert_eq!(entry_count(&scratch).expect("count"), 0);
}

#[test]
fn reset_removes_previous_contents() {
    let root = tempfile::tempdir().expect("tempdir");
    let scratch = root.path().join("vpnconfig");
    fs::create_dir_all(scratch.join("nested/deeper")).expect("mkdir");
    fs::write(scratch.join("old.xml"), "<vpn/>").expect("write");
    fs::write(scratch.join("nested/deeper/stale.xml"), "<vpn/>").expect("write");

    reset_scratch_dir(&scratch).expect("reset");

    assert!(scratch.is_dir());
    assert_eq!(entry_count(&scratch).expect("count"), 0);
}

#[test]
fn reset_twice_is_idempotent() {
    let root = tempfile::tempdir().expect("tempdir");
    let scratch = root.path().join("vpnconfig");

    reset_scratch_dir(&scratch).expect("first reset");
    reset_scratch_dir(&scratch).expect("second reset");

    assert_eq!(entry_count(&scratch).expect("count"), 0);
}

#[test]
fn reset_creates_missing_parents() {
    let root = tempfile::tempdir().expect("tempdir");
    let scratch = root.path().join("target/scenarios/vpnconfig");

    reset_scratch_dir(&scratch).expect("reset");

    assert!(scratch.is_dir());
}

#[test]
fn reset_rejects_regular_file() {
    let root = tempfile::tempdir().expect("tempdir");
    let scratch = root.path().join("vpnconfig");
    fs::write(&scratch, "not a directory").expect("write");

    let err = reset_scratch_dir(&scratch).expect_err("file must not be wiped");

    assert!(matches!(err, ScratchError::Clear { .. }));
    assert!(err.to_string().contains("failed to clear scratch directory"));
    assert!(scratch.is_file());
}

#[test]
fn reset_under_regular_file_fails_without_touching_it() {
    let root = tempfile::tempdir().expect("tempdir");
    let blocker = root.path().join("file");
    fs::write(&blocker, "keep").expect("write");

    let err = reset_scratch_dir(&blocker.join("vpnconfig")).expect_err("parent is a file");

    assert!(err.to_string().contains(&blocker.join("vpnconfig").display().to_string()));
    assert_eq!(fs::read_to_string(&blocker).expect("read"), "keep");
}

#[cfg(unix)]
#[test]
fn reset_reports_create_failure_under_dangling_parent() {
    let root = tempfile::tempdir().expect("tempdir");
    let parent = root.path().join("dangling");
    std::os::unix::fs::symlink(root.path().join("missing"), &parent).expect("symlink");
    let scratch = parent.join("vpnconfig");

    let err = reset_scratch_dir(&scratch).expect_err("create must fail");

    assert!(matches!(err, ScratchError::Create { .. }));
    assert!(err.to_string().contains("failed to create scratch directory"));
    assert!(!root.path().join("missing").exists());
}
