// crates/scenario-env/src/config/tests.rs
// ============================================================================
// Module: Scenario Env Config Tests
// Description: Unit coverage for config file parsing and env overrides.
// Purpose: Ensure configuration parsing fails closed on invalid inputs.
// Dependencies: scenario-env, tempfile
// ============================================================================

//! ## Overview
//! Unit coverage for config file parsing and env overrides.
//! Invariants:
//! - Overrides reject invalid or empty values.
//! - Scratch directories that could wipe the project are rejected.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::fs;
use std::path::Path;

use super::ConfigError;
use super::DEFAULT_MODULE_PATH_VAR;
use super::DEFAULT_PATH_VAR;
use super::ScenarioEnvConfig;
use super::ScenarioEnvVar;
use crate::env_store::MemoryEnv;

fn load(root: &Path, env: &MemoryEnv) -> Result<ScenarioEnvConfig, ConfigError> {
    ScenarioEnvConfig::load_with_env(None, root, env)
}

#[test]
fn defaults_resolve_against_project_root() {
    let root = tempfile::tempdir().expect("tempdir");
    let config = load(root.path(), &MemoryEnv::new()).expect("load");

    assert_eq!(config.project_root, root.path());
    assert_eq!(config.bin_dir, root.path().join("bin"));
    assert_eq!(config.lib_dir, root.path().join("lib"));
    assert_eq!(config.scratch_dir, std::env::temp_dir().join("vpnconfig"));
    assert_eq!(config.path_var, DEFAULT_PATH_VAR);
    assert_eq!(config.module_path_var, DEFAULT_MODULE_PATH_VAR);
    assert!(!config.announce);
    assert_eq!(config.event_log, None);
}

#[test]
fn default_file_under_root_is_applied() {
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(
        root.path().join("scenario-env.toml"),
        r#"
bin_dir = "target/debug"
scratch_dir = "target/scratch"
module_path_var = "TOOL_LIB"
announce = true
"#,
    )
    .expect("write config");

    let config = load(root.path(), &MemoryEnv::new()).expect("load");

    assert_eq!(config.bin_dir, root.path().join("target/debug"));
    assert_eq!(config.lib_dir, root.path().join("lib"));
    assert_eq!(config.scratch_dir, root.path().join("target/scratch"));
    assert_eq!(config.module_path_var, "TOOL_LIB");
    assert!(config.announce);
}

#[test]
fn explicit_config_resolves_project_root_against_file_dir() {
    let root = tempfile::tempdir().expect("tempdir");
    let config_dir = root.path().join("features/support");
    fs::create_dir_all(&config_dir).expect("mkdir");
    let config_path = config_dir.join("env.toml");
    fs::write(&config_path, "project_root = \"../..\"\n").expect("write config");

    let config = ScenarioEnvConfig::load_with_env(
        Some(&config_path),
        Path::new("/elsewhere"),
        &MemoryEnv::new(),
    )
    .expect("load");

    assert_eq!(config.project_root, config_dir.join("../.."));
    assert_eq!(config.lib_dir, config_dir.join("../..").join("lib"));
}

#[test]
fn missing_explicit_config_fails_closed() {
    let root = tempfile::tempdir().expect("tempdir");
    let missing = root.path().join("missing.toml");

    let err = ScenarioEnvConfig::load_with_env(Some(&missing), root.path(), &MemoryEnv::new())
        .expect_err("missing file must fail");

    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn config_env_var_selects_file() {
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(root.path().join("alt.toml"), "path_var = \"TOOL_PATH\"\n").expect("write");
    let env = MemoryEnv::new().with_var(ScenarioEnvVar::ConfigPath.as_str(), "alt.toml");

    let config = load(root.path(), &env).expect("load");

    assert_eq!(config.path_var, "TOOL_PATH");
}

#[test]
fn unknown_keys_are_rejected() {
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(root.path().join("scenario-env.toml"), "scratch = \"/tmp/x\"\n").expect("write");

    let err = load(root.path(), &MemoryEnv::new()).expect_err("unknown key must fail");

    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn oversized_config_is_rejected() {
    let root = tempfile::tempdir().expect("tempdir");
    let padding = "#".repeat(64 * 1024 + 1);
    fs::write(root.path().join("scenario-env.toml"), padding).expect("write");

    let err = load(root.path(), &MemoryEnv::new()).expect_err("oversized must fail");

    assert_eq!(err, ConfigError::Invalid("config file exceeds size limit".to_string()));
}

#[test]
fn env_overrides_take_precedence_over_file() {
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(root.path().join("scenario-env.toml"), "announce = true\n").expect("write");
    let env = MemoryEnv::new()
        .with_var(ScenarioEnvVar::Announce.as_str(), "0")
        .with_var(ScenarioEnvVar::ScratchDir.as_str(), "/var/tmp/scenarios")
        .with_var(ScenarioEnvVar::ModulePathVar.as_str(), "TOOL_LIB")
        .with_var(ScenarioEnvVar::EventLog.as_str(), "events.jsonl");

    let config = load(root.path(), &env).expect("load");

    assert!(!config.announce);
    assert_eq!(config.scratch_dir, Path::new("/var/tmp/scenarios"));
    assert_eq!(config.module_path_var, "TOOL_LIB");
    assert_eq!(config.event_log, Some(root.path().join("events.jsonl")));
}

#[test]
fn project_root_override_moves_default_dirs() {
    let root = tempfile::tempdir().expect("tempdir");
    let other = tempfile::tempdir().expect("tempdir");
    let env = MemoryEnv::new()
        .with_var(ScenarioEnvVar::ProjectRoot.as_str(), other.path().as_os_str());

    let config = load(root.path(), &env).expect("load");

    assert_eq!(config.project_root, other.path());
    assert_eq!(config.bin_dir, other.path().join("bin"));
    assert_eq!(config.lib_dir, other.path().join("lib"));
}

#[test]
fn empty_overrides_fail_closed() {
    let root = tempfile::tempdir().expect("tempdir");
    for key in ScenarioEnvVar::ALL {
        let env = MemoryEnv::new().with_var(key.as_str(), "   ");
        let err = load(root.path(), &env).expect_err("empty override must fail");
        assert_eq!(err, ConfigError::Invalid(format!("{} must not be empty", key.as_str())));
    }
}

#[test]
fn announce_rejects_invalid_values() {
    let root = tempfile::tempdir().expect("tempdir");
    let env = MemoryEnv::new().with_var(ScenarioEnvVar::Announce.as_str(), "maybe");

    assert!(load(root.path(), &env).is_err());
}

#[cfg(unix)]
#[test]
fn non_utf8_override_fails_closed() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let root = tempfile::tempdir().expect("tempdir");
    let env = MemoryEnv::new()
        .with_var(ScenarioEnvVar::ScratchDir.as_str(), OsStr::from_bytes(&[0x2f, 0xff, 0xfe]));

    let err = load(root.path(), &env).expect_err("non-utf8 must fail");

    assert_eq!(
        err,
        ConfigError::Invalid("SCENARIO_ENV_SCRATCH_DIR must be valid UTF-8".to_string())
    );
}

#[test]
fn scratch_dir_must_not_contain_project_root() {
    let root = tempfile::tempdir().expect("tempdir");
    let config = ScenarioEnvConfig::for_project(root.path().join("repo"))
        .with_scratch_dir(root.path());

    assert!(config.validate().is_err());
}

#[test]
fn scratch_dir_must_not_be_filesystem_root() {
    let config = ScenarioEnvConfig::for_project("/repo").with_scratch_dir("/");

    assert!(config.validate().is_err());
}

#[test]
fn scratch_dir_with_parent_components_is_rejected() {
    for scratch in ["/tmp/..", "/repo/lib/..", "/repo/scratch/../.."] {
        let config = ScenarioEnvConfig::for_project("/repo").with_scratch_dir(scratch);
        assert!(config.validate().is_err(), "accepted {scratch}");
    }
}

#[test]
fn scratch_dir_must_not_contain_normalized_project_root() {
    let config = ScenarioEnvConfig::for_project("/work/features/../repo").with_scratch_dir("/work");

    assert!(config.validate().is_err());
}

#[test]
fn scratch_dir_must_not_be_lib_or_bin_dir() {
    for scratch in ["/repo/lib", "/repo/bin"] {
        let config = ScenarioEnvConfig::for_project("/repo").with_scratch_dir(scratch);
        assert!(config.validate().is_err(), "accepted {scratch}");
    }
}

#[test]
fn scratch_dir_must_not_contain_relocated_lib_or_bin_dir() {
    let mut config = ScenarioEnvConfig::for_project("/repo").with_scratch_dir("/opt/stack");
    config.lib_dir = "/opt/stack/lib".into();
    assert!(config.validate().is_err());

    let mut config = ScenarioEnvConfig::for_project("/repo").with_scratch_dir("/opt/stack");
    config.bin_dir = "/opt/stack/target/debug".into();
    assert!(config.validate().is_err());
}

#[test]
fn config_file_scratch_dir_pointing_at_lib_fails_closed() {
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(root.path().join("scenario-env.toml"), "scratch_dir = \"lib\"\n").expect("write");

    let err = load(root.path(), &MemoryEnv::new()).expect_err("lib scratch must fail");

    assert!(err.to_string().contains("lib_dir"), "unexpected error: {err}");
}

#[cfg(unix)]
#[test]
fn nested_scratch_dir_under_project_is_accepted() {
    let config =
        ScenarioEnvConfig::for_project("/repo").with_scratch_dir("/repo/target/scratch/vpnconfig");

    assert!(config.validate().is_ok());
}

#[test]
fn relative_scratch_dir_is_rejected() {
    let config = ScenarioEnvConfig::for_project("/repo").with_scratch_dir("scratch");

    assert!(config.validate().is_err());
}

#[test]
fn identical_variable_names_are_rejected() {
    let config = ScenarioEnvConfig::for_project("/repo").with_module_path_var("PATH");

    let err = config.validate().expect_err("same var must fail");

    assert_eq!(err, ConfigError::Invalid("path_var and module_path_var must differ".to_string()));
}

#[test]
fn malformed_variable_names_are_rejected() {
    for name in ["", "A=B", "HAS SPACE"] {
        let config = ScenarioEnvConfig::for_project("/repo").with_module_path_var(name);
        assert!(config.validate().is_err(), "accepted {name}");
    }
}
