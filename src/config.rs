//! Project configuration.
//!
//! Settings live in `init.toml` next to the `Pipfile`. The file is created
//! with permissive defaults when missing and validated before anything is
//! provisioned.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interpreter::{InterpreterInfo, PythonVersion};
use crate::scaffold;

/// Name of the configuration file inside the project directory.
pub const CONFIG_FILE: &str = "init.toml";

/// Contents written when the configuration file is missing.
pub const DEFAULT_CONFIG: &str = r#"# envinit project settings.

[python]
# Interpreter the pipenv environment is built with (name on PATH or a path).
interpreter = "python3"
# Oldest interpreter release this project accepts. Remove to skip the check.
min_version = "2.7"

[manager]
program = "pipenv"

[tasks]
requirement = "invoke>=1.0.0"
program = "inv"
init_task = "init"
"#;

/// Interpreter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PythonConfig {
    /// Interpreter name or path.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Minimum accepted release, e.g. `"3.8"`.
    #[serde(default)]
    pub min_version: Option<String>,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            min_version: None,
        }
    }
}

/// Environment manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Environment manager binary.
    #[serde(default = "default_manager")]
    pub program: String,
}

fn default_manager() -> String {
    "pipenv".to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            program: default_manager(),
        }
    }
}

/// Task runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Requirement installed into the environment for the task runner.
    #[serde(default = "default_requirement")]
    pub requirement: String,
    /// Task runner executable inside the environment.
    #[serde(default = "default_task_program")]
    pub program: String,
    /// Task run after every provisioning.
    #[serde(default = "default_init_task")]
    pub init_task: String,
}

fn default_requirement() -> String {
    "invoke>=1.0.0".to_string()
}

fn default_task_program() -> String {
    "inv".to_string()
}

fn default_init_task() -> String {
    "init".to_string()
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            requirement: default_requirement(),
            program: default_task_program(),
            init_task: default_init_task(),
        }
    }
}

/// Contents of `init.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitConfig {
    #[serde(default)]
    pub python: PythonConfig,
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
}

impl InitConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Returns the parsed minimum version, if one is configured.
    pub fn min_version(&self) -> Result<Option<PythonVersion>> {
        self.python
            .min_version
            .as_deref()
            .map(str::parse)
            .transpose()
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Validate for InitConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.python.interpreter.trim().is_empty() {
            result.add_error("python.interpreter cannot be empty");
        }

        if let Some(min) = &self.python.min_version {
            if min.parse::<PythonVersion>().is_err() {
                result.add_error(format!(
                    "python.min_version '{}' is not MAJOR[.MINOR[.PATCH]]",
                    min
                ));
            }
        }

        if self.manager.program.trim().is_empty() {
            result.add_error("manager.program cannot be empty");
        }

        if self.tasks.program.trim().is_empty() {
            result.add_error("tasks.program cannot be empty");
        }

        if !is_identifier(&self.tasks.init_task) {
            result.add_error(format!(
                "tasks.init_task '{}' is not a valid Python function name",
                self.tasks.init_task
            ));
        }

        if !self.tasks.requirement.to_lowercase().contains("invoke") {
            result.add_warning(format!(
                "tasks.requirement '{}' does not mention invoke; the default tasks.py imports it",
                self.tasks.requirement
            ));
        }

        result
    }
}

/// Configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path of `init.toml`.
    pub path: PathBuf,
    /// Parsed settings.
    pub config: InitConfig,
}

/// Loads `init.toml` from the project directory, creating it if missing.
pub fn load(project_dir: &Path) -> Result<LoadedConfig> {
    let path = project_dir.join(CONFIG_FILE);
    scaffold::ensure_file(&path, DEFAULT_CONFIG)?;

    let located = |e: Error| match e {
        Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
        other => other,
    };

    let text = std::fs::read_to_string(&path)?;
    let config = InitConfig::from_toml(&text).map_err(located)?;

    let warnings = config.validate().into_result().map_err(located)?;
    for warning in warnings {
        tracing::warn!(config = ?path, "{}", warning);
    }

    Ok(LoadedConfig { path, config })
}

/// Checks the interpreter against `python.min_version`.
///
/// A missing minimum skips the check.
pub fn check_python_version(loaded: &LoadedConfig, info: &InterpreterInfo) -> Result<()> {
    let Some(required) = loaded.config.min_version()? else {
        tracing::info!(config = ?loaded.path, "python.min_version not set, skipping check");
        return Ok(());
    };

    let found = info.release();
    if found < required {
        return Err(Error::PythonVersion {
            version: info.version.clone(),
            required: required.to_string(),
            config: loaded.path.clone(),
        });
    }

    tracing::info!(found = %found, required = %required, "Python version OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn info(version_info: Vec<u32>) -> InterpreterInfo {
        InterpreterInfo {
            version: "3.8.10 (default, Nov 22 2023) [GCC 9.4.0]".to_string(),
            version_info,
            executable: PathBuf::from("/usr/bin/python3"),
        }
    }

    fn loaded(min_version: Option<&str>) -> LoadedConfig {
        let mut config = InitConfig::default();
        config.python.min_version = min_version.map(String::from);
        LoadedConfig {
            path: PathBuf::from("init.toml"),
            config,
        }
    }

    // ========================================
    // Parsing
    // ========================================

    #[test]
    fn default_config_text_parses_and_validates() {
        let config = InitConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.python.interpreter, "python3");
        assert_eq!(config.python.min_version.as_deref(), Some("2.7"));
        assert_eq!(config.manager.program, "pipenv");
        assert_eq!(config.tasks.init_task, "init");

        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = InitConfig::from_toml("").unwrap();
        assert_eq!(config, InitConfig::default());
        assert!(config.python.min_version.is_none());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = InitConfig::from_toml("[python]\nmin_version = \"3.9\"\n").unwrap();
        assert_eq!(config.python.interpreter, "python3");
        assert_eq!(
            config.min_version().unwrap(),
            Some(PythonVersion::new(3, 9, 0))
        );
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = InitConfig::from_toml("[python\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    // ========================================
    // Validation
    // ========================================

    #[test]
    fn invalid_min_version_fails_validation() {
        let mut config = InitConfig::default();
        config.python.min_version = Some(">=3.6".to_string());
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("min_version"));
    }

    #[test]
    fn empty_programs_fail_validation() {
        let mut config = InitConfig::default();
        config.python.interpreter = " ".to_string();
        config.manager.program = String::new();
        let result = config.validate();
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn init_task_must_be_identifier() {
        let mut config = InitConfig::default();
        config.tasks.init_task = "set-up".to_string();
        assert!(!config.validate().is_valid());

        config.tasks.init_task = "_setup2".to_string();
        assert!(config.validate().is_valid());
    }

    #[test]
    fn unrelated_requirement_warns() {
        let mut config = InitConfig::default();
        config.tasks.requirement = "doit".to_string();
        let result = config.validate();
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
    }

    // ========================================
    // Loading
    // ========================================

    #[test]
    fn load_scaffolds_missing_config() {
        let dir = TempDir::new().unwrap();
        let loaded = load(dir.path()).unwrap();

        assert_eq!(loaded.path, dir.path().join(CONFIG_FILE));
        assert_eq!(
            std::fs::read_to_string(&loaded.path).unwrap(),
            DEFAULT_CONFIG
        );
        assert_eq!(loaded.config.python.min_version.as_deref(), Some("2.7"));
    }

    #[test]
    fn load_keeps_existing_config() {
        let dir = TempDir::new().unwrap();
        let custom = "[python]\ninterpreter = \"python3.12\"\n";
        std::fs::write(dir.path().join(CONFIG_FILE), custom).unwrap();

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.config.python.interpreter, "python3.12");
        assert_eq!(
            std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(),
            custom
        );
    }

    #[test]
    fn load_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[tasks]\ninit_task = \"1st\"\n",
        )
        .unwrap();

        let err = load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("init_task"));
    }

    // ========================================
    // Version check
    // ========================================

    #[test]
    fn version_check_skipped_without_minimum() {
        assert!(check_python_version(&loaded(None), &info(vec![2, 6, 9])).is_ok());
    }

    #[test]
    fn version_check_accepts_equal_and_newer() {
        assert!(check_python_version(&loaded(Some("3.8")), &info(vec![3, 8, 0])).is_ok());
        assert!(check_python_version(&loaded(Some("3.8")), &info(vec![3, 12, 1])).is_ok());
    }

    #[test]
    fn version_check_rejects_older() {
        let err = check_python_version(&loaded(Some("3.9")), &info(vec![3, 8, 10])).unwrap_err();
        match err {
            Error::PythonVersion {
                version, required, ..
            } => {
                assert!(version.starts_with("3.8.10"));
                assert_eq!(required, "3.9.0");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
