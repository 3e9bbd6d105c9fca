//! Environment provisioning.
//!
//! Brings the project's pipenv environment in line with the desired
//! interpreter, syncs dependencies, bootstraps the task runner and finally
//! hands control to the user's command.
//!
//! pipenv happily reuses an existing environment even when it was built by a
//! different interpreter, so staleness is detected here by comparing the
//! exact `sys.version` strings and fixed by forcing a rebuild with
//! `--python`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::command::CommandRunner;
use crate::config::{InitConfig, TaskConfig};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::manager::EnvManager;
use crate::scaffold;

/// Observed state of the project's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// No environment has been created (or it was just cleaned).
    Absent,
    /// An environment exists.
    Present {
        /// Environment directory.
        path: PathBuf,
        /// `sys.version` reported inside the environment, `None` if its
        /// interpreter could not be run.
        version: Option<String>,
    },
}

/// Why an environment has to be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// There is no environment yet.
    Missing,
    /// The environment's interpreter did not answer the probe.
    Unreadable,
    /// The environment was built with another interpreter.
    VersionMismatch { found: String, wanted: String },
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildReason::Missing => write!(f, "no environment exists"),
            RebuildReason::Unreadable => write!(f, "environment interpreter did not respond"),
            RebuildReason::VersionMismatch { found, wanted } => write!(
                f,
                "environment uses Python {:?}, wanted {:?}",
                found, wanted
            ),
        }
    }
}

/// What to do with the environment before syncing dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentAction {
    /// Recreate it with the desired interpreter.
    Rebuild(RebuildReason),
    /// Keep it as is.
    Reuse,
}

/// Decides whether the environment must be rebuilt for `wanted_version`.
///
/// Versions are compared byte-for-byte.
pub fn plan(environment: &Environment, wanted_version: &str) -> EnvironmentAction {
    match environment {
        Environment::Absent => EnvironmentAction::Rebuild(RebuildReason::Missing),
        Environment::Present { version: None, .. } => {
            EnvironmentAction::Rebuild(RebuildReason::Unreadable)
        }
        Environment::Present {
            version: Some(found),
            ..
        } if found.as_str() != wanted_version => {
            EnvironmentAction::Rebuild(RebuildReason::VersionMismatch {
                found: found.clone(),
                wanted: wanted_version.to_string(),
            })
        }
        Environment::Present { .. } => EnvironmentAction::Reuse,
    }
}

/// A single provisioning request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Remove the existing environment first.
    pub clean: bool,
    /// Run `pipenv update` after installing.
    pub upgrade: bool,
    /// Command to run inside the environment afterwards.
    pub command: Vec<String>,
}

impl ProvisionRequest {
    /// Creates a request that runs `command` after provisioning.
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            ..Default::default()
        }
    }

    /// Sets whether to remove the environment first.
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Sets whether to upgrade locked dependencies.
    pub fn with_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }
}

/// Outcome of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    /// What was done to the environment.
    pub action: EnvironmentAction,
    /// Exit code of the delegated command, 0 when there was none.
    pub exit_code: i32,
}

/// Provisions one project directory.
pub struct Provisioner<R> {
    manager: EnvManager<R>,
    interpreter: Interpreter,
    tasks: TaskConfig,
}

impl<R: CommandRunner> Provisioner<R> {
    /// Creates a provisioner for `project_dir` using settings from `config`.
    pub fn new(
        runner: R,
        project_dir: impl Into<PathBuf>,
        config: &InitConfig,
        interpreter: Interpreter,
    ) -> Self {
        Self {
            manager: EnvManager::new(runner, config.manager.program.clone(), project_dir),
            interpreter,
            tasks: config.tasks.clone(),
        }
    }

    fn project_dir(&self) -> &Path {
        self.manager.project_dir()
    }

    /// Runs every provisioning step and then the delegated command.
    ///
    /// The delegated command's exit code is reported, not turned into an
    /// error.
    pub fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionReport> {
        tracing::info!(project_dir = ?self.project_dir(), "provisioning project");

        // Nothing is written until the manager is known to exist.
        self.manager.probe()?;
        scaffold::ensure_manifest(self.project_dir())?;

        let environment = self.inspect(request.clean)?;
        let action = self.reconcile(&environment)?;

        self.manager.install(&[])?;
        if request.upgrade {
            self.manager.update()?;
        }

        self.bootstrap_tasks()?;

        let exit_code = self.delegate(&request.command)?;
        Ok(ProvisionReport { action, exit_code })
    }

    /// Looks up the existing environment, removing it first when `clean`.
    pub fn inspect(&self, clean: bool) -> Result<Environment> {
        let Some(path) = self.manager.venv()? else {
            tracing::info!("no environment found");
            return Ok(Environment::Absent);
        };

        if clean {
            remove_environment(&path)?;
            return Ok(Environment::Absent);
        }

        let version = self
            .manager
            .environment_interpreter()?
            .map(|info| info.version);
        tracing::info!(path = ?path, version = ?version, "found environment");
        Ok(Environment::Present { path, version })
    }

    fn reconcile(&self, environment: &Environment) -> Result<EnvironmentAction> {
        let wanted = self.interpreter.version();
        let action = plan(environment, wanted);

        match &action {
            EnvironmentAction::Reuse => {
                tracing::info!("environment matches interpreter, reusing it");
            }
            EnvironmentAction::Rebuild(reason) => {
                tracing::info!(
                    reason = %reason,
                    interpreter = ?self.interpreter.executable(),
                    "rebuilding environment"
                );
                let built = self.manager.rebuild(self.interpreter.executable())?;
                if built.version != wanted {
                    tracing::warn!(
                        built = %built.version,
                        wanted = %wanted,
                        "rebuilt environment reports a different Python version"
                    );
                }
            }
        }

        Ok(action)
    }

    fn bootstrap_tasks(&self) -> Result<()> {
        scaffold::ensure_task_files(self.project_dir(), &self.tasks.init_task)?;
        self.manager.install(&[self.tasks.requirement.clone()])?;
        self.manager
            .run(&[self.tasks.program.clone(), self.tasks.init_task.clone()])
    }

    fn delegate(&self, command: &[String]) -> Result<i32> {
        if command.is_empty() {
            tracing::info!("no command given, initialization complete");
            return Ok(0);
        }

        let code = self.manager.run_unchecked(command)?;
        if code != 0 {
            tracing::info!(code, "command exited with non-zero status");
        }
        Ok(code)
    }
}

/// Deletes an environment directory.
///
/// A directory that is already gone counts as removed.
fn remove_environment(path: &Path) -> Result<()> {
    println!("Removing environment {}", path.display());
    match std::fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = ?path, "environment directory already gone");
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(path = ?path, "removed environment");
    Ok(())
}
