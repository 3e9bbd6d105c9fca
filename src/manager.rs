//! Environment manager integration.
//!
//! Wraps the `pipenv` CLI. Commands run in the project directory so pipenv
//! picks up the project's `Pipfile`.

use std::path::{Path, PathBuf};

use crate::command::{self, CommandLine, CommandRunner};
use crate::error::{Error, Result};
use crate::interpreter::{self, InterpreterInfo, PROBE_SCRIPT};

/// Interpreter name inside an environment.
const ENV_PYTHON: &str = "python";

/// Answers pipenv's confirmation prompts, such as replacing an active
/// virtualenv, without reading stdin.
const ASSUME_YES: (&str, &str) = ("PIPENV_YES", "1");

/// Hint shown when the environment manager is not installed.
pub const INSTALL_HINT: &str =
    "install pipenv with `python3 -m pip install --user pipenv` (https://pipenv.pypa.io)";

/// Client for the environment manager CLI.
pub struct EnvManager<R> {
    runner: R,
    program: String,
    project_dir: PathBuf,
}

impl<R: CommandRunner> EnvManager<R> {
    /// Creates a client that runs `program` inside `project_dir`.
    pub fn new(runner: R, program: impl Into<String>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: program.into(),
            project_dir: project_dir.into(),
        }
    }

    /// Returns the project directory commands run in.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn command(&self) -> CommandLine {
        CommandLine::new(&self.program)
    }

    fn hinted<T>(result: Result<T>) -> Result<T> {
        result.map_err(|e| e.with_hint(INSTALL_HINT))
    }

    /// Checks that the manager is installed and returns its version banner.
    pub fn probe(&self) -> Result<String> {
        let cmd = self.command().arg("--version");
        let captured = Self::hinted(command::capture(&self.runner, &cmd, &self.project_dir))?
            .check(&cmd)?;
        let banner = captured.stdout.trim().to_string();
        tracing::info!(manager = %self.program, version = %banner, "environment manager available");
        Ok(banner)
    }

    /// Returns the path of the project's environment, or `None` if it has
    /// not been created yet.
    pub fn venv(&self) -> Result<Option<PathBuf>> {
        let cmd = self.command().arg("--venv");
        let captured = Self::hinted(command::capture(&self.runner, &cmd, &self.project_dir))?;
        if !captured.success() {
            return Ok(None);
        }

        let path = captured.stdout.trim();
        if path.is_empty() {
            return Err(Error::Probe {
                command: cmd.to_string(),
                reason: "environment path was empty".to_string(),
            });
        }
        Ok(Some(PathBuf::from(path)))
    }

    /// Asks the environment's own interpreter who it is.
    ///
    /// Returns `None` when the interpreter inside the environment cannot run.
    pub fn environment_interpreter(&self) -> Result<Option<InterpreterInfo>> {
        let cmd = self.command().args(["run", ENV_PYTHON, "-c", PROBE_SCRIPT]);
        Self::hinted(interpreter::probe(&self.runner, &cmd, &self.project_dir))
    }

    /// Recreates the environment with `interpreter` and probes the result.
    ///
    /// Passing `--python` makes pipenv discard an environment built with a
    /// different interpreter instead of reusing it.
    pub fn rebuild(&self, interpreter: &Path) -> Result<InterpreterInfo> {
        let cmd = self
            .command()
            .env(ASSUME_YES.0, ASSUME_YES.1)
            .arg("--python")
            .arg(interpreter.to_string_lossy())
            .args(["run", ENV_PYTHON, "-c", PROBE_SCRIPT]);
        println!("$ {}", cmd);

        let captured =
            Self::hinted(command::capture(&self.runner, &cmd, &self.project_dir))?.check(&cmd)?;
        InterpreterInfo::parse(&captured.stdout).map_err(|reason| Error::Probe {
            command: cmd.to_string(),
            reason,
        })
    }

    /// Installs the manifest's dependencies, plus `packages` when given.
    pub fn install(&self, packages: &[String]) -> Result<()> {
        let cmd = self.command().arg("install").args(packages.iter().cloned());
        Self::hinted(command::run(&self.runner, &cmd, &self.project_dir))
    }

    /// Upgrades locked dependencies.
    pub fn update(&self) -> Result<()> {
        let cmd = self.command().arg("update");
        Self::hinted(command::run(&self.runner, &cmd, &self.project_dir))
    }

    /// Runs a command inside the environment and fails if it fails.
    pub fn run(&self, args: &[String]) -> Result<()> {
        let cmd = self.command().arg("run").args(args.iter().cloned());
        Self::hinted(command::run(&self.runner, &cmd, &self.project_dir))
    }

    /// Runs a command inside the environment and returns its exit code.
    pub fn run_unchecked(&self, args: &[String]) -> Result<i32> {
        let cmd = self.command().arg("run").args(args.iter().cloned());
        Self::hinted(command::run_unchecked(&self.runner, &cmd, &self.project_dir))
    }
}
