//! Project file scaffolding.
//!
//! Files are only ever created, never rewritten: a file that already exists
//! is left exactly as it is.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;

/// Dependency manifest read by pipenv.
pub const MANIFEST_FILE: &str = "Pipfile";

/// Task runner settings file.
pub const TASK_SETTINGS_FILE: &str = "invoke.py";

/// Task definitions file.
pub const TASKS_FILE: &str = "tasks.py";

/// Default manifest: a single package index and no packages.
pub const DEFAULT_MANIFEST: &str = r#"[[source]]
url = "https://pypi.org/simple"
verify_ssl = true
name = "pypi"
"#;

/// Default task runner settings.
pub const DEFAULT_TASK_SETTINGS: &str = r#"debug = True
run = {
    'echo': True,
    'pty': True,
}
"#;

/// Renders a tasks file defining one no-op task named `init_task`.
pub fn default_tasks(init_task: &str) -> String {
    format!(
        r#"from invoke import task


@task
def {init_task}(ctx):
    """Run after every envinit provisioning."""
"#
    )
}

/// Creates `path` with `content` unless it already exists.
///
/// Returns true if the file was created.
pub fn ensure_file(path: &Path, content: &str) -> Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = ?path, "file exists, leaving it untouched");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    println!("File {} does not exist, creating it", path.display());
    file.write_all(content.as_bytes())?;
    tracing::info!(path = ?path, "created file");
    Ok(true)
}

/// Ensures the dependency manifest exists in `project_dir`.
pub fn ensure_manifest(project_dir: &Path) -> Result<bool> {
    ensure_file(&project_dir.join(MANIFEST_FILE), DEFAULT_MANIFEST)
}

/// Ensures the task runner settings and task definitions exist in `project_dir`.
pub fn ensure_task_files(project_dir: &Path, init_task: &str) -> Result<()> {
    ensure_file(&project_dir.join(TASK_SETTINGS_FILE), DEFAULT_TASK_SETTINGS)?;
    ensure_file(&project_dir.join(TASKS_FILE), &default_tasks(init_task))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ensure_file_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Pipfile");

        assert!(ensure_file(&path, "content").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }

    #[test]
    fn ensure_file_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Pipfile");
        std::fs::write(&path, "user edits").unwrap();

        assert!(!ensure_file(&path, "default").unwrap());
        assert!(!ensure_file(&path, "default").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "user edits");
    }

    #[test]
    fn ensure_file_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        ensure_manifest(dir.path()).unwrap();
        let before = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();

        assert!(!ensure_manifest(dir.path()).unwrap());
        let after = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn ensure_file_reports_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("Pipfile");
        assert!(ensure_file(&path, "x").is_err());
    }

    #[test]
    fn task_files_use_configured_task_name() {
        let dir = TempDir::new().unwrap();
        ensure_task_files(dir.path(), "bootstrap").unwrap();

        let tasks = std::fs::read_to_string(dir.path().join(TASKS_FILE)).unwrap();
        assert!(tasks.contains("def bootstrap(ctx):"));
        assert!(tasks.contains("from invoke import task"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(TASK_SETTINGS_FILE)).unwrap(),
            DEFAULT_TASK_SETTINGS
        );
    }

    #[test]
    fn default_manifest_declares_one_source() {
        assert_eq!(DEFAULT_MANIFEST.matches("[[source]]").count(), 1);
        assert!(DEFAULT_MANIFEST.contains("https://pypi.org/simple"));
    }
}
