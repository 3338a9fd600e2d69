// crates/scenario-env/src/config.rs
// ============================================================================
// Module: Scenario Env Configuration
// Description: Configuration loading and validation for scenario provisioning.
// Purpose: Provide strict, fail-closed config parsing with env overrides.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration starts from defaults rooted at a project directory, applies
//! an optional `scenario-env.toml` file, then applies `SCENARIO_ENV_*`
//! environment overrides. Environment values are parsed with strict UTF-8
//! enforcement and empty values are rejected. Validation fails closed on
//! scratch directories that could wipe the project or a filesystem root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::env_store::EnvStore;
use crate::env_store::ProcessEnv;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename looked up under the project root.
pub const DEFAULT_CONFIG_NAME: &str = "scenario-env.toml";
/// Default command search path variable.
pub const DEFAULT_PATH_VAR: &str = "PATH";
/// Default module search path variable consulted by the tool under test.
pub const DEFAULT_MODULE_PATH_VAR: &str = "RUBYLIB";
/// Default scratch directory name under the platform temp root.
pub const DEFAULT_SCRATCH_NAME: &str = "vpnconfig";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys that override configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioEnvVar {
    /// Config file path.
    ConfigPath,
    /// Project root override.
    ProjectRoot,
    /// Scratch directory override.
    ScratchDir,
    /// Module search path variable name override.
    ModulePathVar,
    /// Echo command output as lifecycle events (`true`/`false` or `1`/`0`).
    Announce,
    /// JSON-lines lifecycle event log file.
    EventLog,
}

impl ScenarioEnvVar {
    /// All override keys in load order.
    pub const ALL: [Self; 6] = [
        Self::ConfigPath,
        Self::ProjectRoot,
        Self::ScratchDir,
        Self::ModulePathVar,
        Self::Announce,
        Self::EventLog,
    ];

    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => "SCENARIO_ENV_CONFIG",
            Self::ProjectRoot => "SCENARIO_ENV_PROJECT_ROOT",
            Self::ScratchDir => "SCENARIO_ENV_SCRATCH_DIR",
            Self::ModulePathVar => "SCENARIO_ENV_MODULE_PATH_VAR",
            Self::Announce => "SCENARIO_ENV_ANNOUNCE",
            Self::EventLog => "SCENARIO_ENV_EVENT_LOG",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: File Model
// ============================================================================

/// On-disk configuration file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    /// Project root; relative paths resolve against the config file directory.
    project_root: Option<PathBuf>,
    /// Executable directory; relative paths resolve against the project root.
    bin_dir: Option<PathBuf>,
    /// Library directory; relative paths resolve against the project root.
    lib_dir: Option<PathBuf>,
    /// Scratch directory; relative paths resolve against the project root.
    scratch_dir: Option<PathBuf>,
    /// Command search path variable name.
    path_var: Option<String>,
    /// Module search path variable name.
    module_path_var: Option<String>,
    /// Echo command output as lifecycle events.
    announce: Option<bool>,
    /// JSON-lines lifecycle event log file.
    event_log: Option<PathBuf>,
}

// ============================================================================
// SECTION: Config Type
// ============================================================================

/// Resolved scenario environment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioEnvConfig {
    /// Directory that `bin` and `lib` are resolved against.
    pub project_root: PathBuf,
    /// Directory prepended to the command search path.
    pub bin_dir: PathBuf,
    /// Directory prepended to the module search path.
    pub lib_dir: PathBuf,
    /// Directory wiped and recreated before every scenario.
    pub scratch_dir: PathBuf,
    /// Command search path variable name.
    pub path_var: String,
    /// Module search path variable name.
    pub module_path_var: String,
    /// Echo command output as lifecycle events.
    pub announce: bool,
    /// Optional JSON-lines lifecycle event log file.
    pub event_log: Option<PathBuf>,
}

impl ScenarioEnvConfig {
    /// Returns defaults rooted at `project_root`.
    #[must_use]
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            bin_dir: project_root.join("bin"),
            lib_dir: project_root.join("lib"),
            scratch_dir: std::env::temp_dir().join(DEFAULT_SCRATCH_NAME),
            path_var: DEFAULT_PATH_VAR.to_string(),
            module_path_var: DEFAULT_MODULE_PATH_VAR.to_string(),
            announce: false,
            event_log: None,
            project_root,
        }
    }

    /// Returns the config with a different scratch directory.
    #[must_use]
    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    /// Returns the config with a different module search path variable.
    #[must_use]
    pub fn with_module_path_var(mut self, name: impl Into<String>) -> Self {
        self.module_path_var = name.into();
        self
    }

    /// Returns the config with announce mode toggled.
    #[must_use]
    pub const fn with_announce(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }

    /// Loads configuration using the live process environment for overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file or overrides are invalid.
    pub fn load(path: Option<&Path>, default_root: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, default_root, &ProcessEnv)
    }

    /// Loads configuration, reading overrides from `env`.
    ///
    /// The config file is `path` when given, else `SCENARIO_ENV_CONFIG`, else
    /// `scenario-env.toml` under `default_root` when that file exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit config file is missing, the
    /// file is oversized, not UTF-8, or not valid TOML, an override is
    /// invalid, or the resolved configuration fails validation.
    pub fn load_with_env(
        path: Option<&Path>,
        default_root: &Path,
        env: &dyn EnvStore,
    ) -> Result<Self, ConfigError> {
        let explicit = match path {
            Some(path) => Some(path.to_path_buf()),
            None => read_env_nonempty(env, ScenarioEnvVar::ConfigPath)?
                .map(|value| resolve(default_root, Path::new(&value))),
        };
        let (file, file_dir) = match explicit {
            Some(path) => (read_config_file(&path)?, parent_dir(&path, default_root)),
            None => {
                let candidate = default_root.join(DEFAULT_CONFIG_NAME);
                if candidate.is_file() {
                    (read_config_file(&candidate)?, default_root.to_path_buf())
                } else {
                    (ConfigFile::default(), default_root.to_path_buf())
                }
            }
        };

        let mut config = Self::from_file(file, &file_dir, default_root);
        config.apply_env(env, default_root)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from file values layered over defaults.
    fn from_file(file: ConfigFile, file_dir: &Path, default_root: &Path) -> Self {
        let project_root = file
            .project_root
            .map_or_else(|| default_root.to_path_buf(), |root| resolve(file_dir, &root));
        let mut config = Self::for_project(project_root);
        if let Some(bin_dir) = file.bin_dir {
            config.bin_dir = resolve(&config.project_root, &bin_dir);
        }
        if let Some(lib_dir) = file.lib_dir {
            config.lib_dir = resolve(&config.project_root, &lib_dir);
        }
        if let Some(scratch_dir) = file.scratch_dir {
            config.scratch_dir = resolve(&config.project_root, &scratch_dir);
        }
        if let Some(path_var) = file.path_var {
            config.path_var = path_var;
        }
        if let Some(module_path_var) = file.module_path_var {
            config.module_path_var = module_path_var;
        }
        if let Some(announce) = file.announce {
            config.announce = announce;
        }
        config.event_log = file.event_log.map(|log| resolve(&config.project_root, &log));
        config
    }

    /// Applies `SCENARIO_ENV_*` overrides.
    fn apply_env(&mut self, env: &dyn EnvStore, default_root: &Path) -> Result<(), ConfigError> {
        if let Some(root) = read_env_nonempty(env, ScenarioEnvVar::ProjectRoot)? {
            let root = resolve(default_root, Path::new(&root));
            self.bin_dir = rebase(&self.bin_dir, &self.project_root, &root);
            self.lib_dir = rebase(&self.lib_dir, &self.project_root, &root);
            self.project_root = root;
        }
        if let Some(scratch_dir) = read_env_nonempty(env, ScenarioEnvVar::ScratchDir)? {
            self.scratch_dir = resolve(default_root, Path::new(&scratch_dir));
        }
        if let Some(name) = read_env_nonempty(env, ScenarioEnvVar::ModulePathVar)? {
            self.module_path_var = name.trim().to_string();
        }
        if let Some(announce) = read_env_nonempty(env, ScenarioEnvVar::Announce)? {
            self.announce = parse_bool(ScenarioEnvVar::Announce.as_str(), &announce)?;
        }
        if let Some(log) = read_env_nonempty(env, ScenarioEnvVar::EventLog)? {
            self.event_log = Some(resolve(default_root, Path::new(&log)));
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable name is malformed,
    /// both variables are the same, or the scratch directory is relative,
    /// holds `.`/`..` components, is a filesystem root, or contains the
    /// project root, `bin_dir`, or `lib_dir`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_var_name("path_var", &self.path_var)?;
        validate_var_name("module_path_var", &self.module_path_var)?;
        if self.path_var == self.module_path_var {
            return Err(ConfigError::Invalid(
                "path_var and module_path_var must differ".to_string(),
            ));
        }
        if !self.scratch_dir.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "scratch_dir must be absolute: {}",
                self.scratch_dir.display()
            )));
        }
        if self
            .scratch_dir
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::CurDir))
        {
            return Err(ConfigError::Invalid(format!(
                "scratch_dir must not contain '.' or '..' components: {}",
                self.scratch_dir.display()
            )));
        }
        if self.scratch_dir.parent().is_none() {
            return Err(ConfigError::Invalid("scratch_dir must not be a filesystem root".to_string()));
        }
        let protected = [
            ("project root", &self.project_root),
            ("bin_dir", &self.bin_dir),
            ("lib_dir", &self.lib_dir),
        ];
        for (label, dir) in protected {
            if normalize_lexically(dir).starts_with(&self.scratch_dir) {
                return Err(ConfigError::Invalid(format!(
                    "scratch_dir {} must not contain the {label}",
                    self.scratch_dir.display()
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads and parses a config file with size and UTF-8 limits.
fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let bytes = fs::read(path)
        .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    let content = std::str::from_utf8(&bytes)
        .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
    toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
}

/// Returns the directory containing `path`, falling back to `default_root`.
fn parent_dir(path: &Path, default_root: &Path) -> PathBuf {
    let absolute = resolve(default_root, path);
    absolute.parent().map_or_else(|| default_root.to_path_buf(), Path::to_path_buf)
}

/// Joins `path` onto `base` unless it is already absolute.
fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base.join(path) }
}

/// Moves `path` from under `old_root` to under `new_root` when it was nested there.
fn rebase(path: &Path, old_root: &Path, new_root: &Path) -> PathBuf {
    path.strip_prefix(old_root).map_or_else(|_| path.to_path_buf(), |rest| new_root.join(rest))
}

/// Resolves `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Rejects empty names and names the platform cannot store.
fn validate_var_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must not be empty")));
    }
    if name.contains('=') || name.contains('\0') || name.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!("{field} is not a valid variable name: {name}")));
    }
    Ok(())
}

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(env: &dyn EnvStore, name: &str) -> Result<Option<String>, ConfigError> {
    env.get(name).map_or(Ok(None), |raw| {
        raw.into_string()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an override and rejects empty values.
fn read_env_nonempty(
    env: &dyn EnvStore,
    key: ScenarioEnvVar,
) -> Result<Option<String>, ConfigError> {
    let name = key.as_str();
    match read_env_strict(env, name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Invalid(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a boolean override.
fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(ConfigError::Invalid(format!("{name} must be 1, 0, true, or false")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
