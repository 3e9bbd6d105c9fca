//! Python interpreter identity.
//!
//! The interpreter an environment was built with is identified by the exact
//! `sys.version` string it reports. Both the desired interpreter and the one
//! inside an existing environment are asked through the same probe script.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::command::{self, CommandLine, CommandRunner};
use crate::error::{Error, Result};

/// Prints the interpreter identity as a single JSON line.
///
/// Kept compatible with Python 2.7 so old environments can still be probed.
pub const PROBE_SCRIPT: &str = "import json, sys; print(json.dumps({'version': sys.version, 'version_info': list(sys.version_info[:3]), 'executable': sys.executable}))";

/// Hint shown when the configured interpreter is missing.
pub const INSTALL_HINT: &str =
    "install Python 3 or set python.interpreter in init.toml to an existing interpreter";

/// A `MAJOR.MINOR.PATCH` release number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PythonVersion {
    /// Creates a version from its components.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Ord for PythonVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for PythonVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for PythonVersion {
    type Err = Error;

    /// Parses `MAJOR`, `MAJOR.MINOR` or `MAJOR.MINOR.PATCH`; missing parts are zero.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Config(format!("invalid Python version '{}'", s));

        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }

        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// What an interpreter reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterpreterInfo {
    /// `sys.version`, compared byte-for-byte between environments.
    pub version: String,
    /// `sys.version_info[:3]`.
    pub version_info: Vec<u32>,
    /// `sys.executable`.
    #[serde(default)]
    pub executable: PathBuf,
}

impl InterpreterInfo {
    /// Parses the probe output.
    ///
    /// Only the last line starting with `{` is considered, so anything the
    /// environment manager prints around the probe is ignored.
    pub fn parse(stdout: &str) -> std::result::Result<Self, String> {
        let line = stdout
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with('{'))
            .last()
            .ok_or_else(|| "no probe output found".to_string())?;

        let info: InterpreterInfo =
            serde_json::from_str(line).map_err(|e| format!("invalid probe output: {}", e))?;

        if info.version_info.is_empty() {
            return Err("probe reported an empty version_info".to_string());
        }
        Ok(info)
    }

    /// Returns the structured release number.
    pub fn release(&self) -> PythonVersion {
        let part = |i: usize| self.version_info.get(i).copied().unwrap_or(0);
        PythonVersion::new(part(0), part(1), part(2))
    }
}

/// Runs a probe command and parses its output.
///
/// Returns `Ok(None)` when the probe exits non-zero.
pub fn probe<R: CommandRunner + ?Sized>(
    runner: &R,
    probe: &CommandLine,
    cwd: &Path,
) -> Result<Option<InterpreterInfo>> {
    let captured = command::capture(runner, probe, cwd)?;
    if !captured.success() {
        tracing::debug!(command = %probe, code = captured.code, "interpreter probe failed");
        return Ok(None);
    }

    InterpreterInfo::parse(&captured.stdout)
        .map(Some)
        .map_err(|reason| Error::Probe {
            command: probe.to_string(),
            reason,
        })
}

/// The interpreter environments should be built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    /// Absolute path handed to the environment manager.
    pub path: PathBuf,
    /// What the interpreter reported about itself.
    pub info: InterpreterInfo,
}

impl Interpreter {
    /// Returns the exact version string.
    pub fn version(&self) -> &str {
        &self.info.version
    }

    /// Returns the binary environments should be built with.
    ///
    /// This is the `sys.executable` the interpreter reported, so launcher
    /// shims found on the search path are not handed on. Falls back to the
    /// resolved path when the interpreter did not report one.
    pub fn executable(&self) -> &Path {
        if self.info.executable.as_os_str().is_empty() {
            &self.path
        } else {
            &self.info.executable
        }
    }

    /// Resolves `name` on the search path and probes it.
    ///
    /// `name` may also be a relative or absolute path.
    pub fn resolve<R: CommandRunner + ?Sized>(
        runner: &R,
        name: &str,
        cwd: &Path,
    ) -> Result<Self> {
        let probe_cmd = CommandLine::new(name).args(["-c", PROBE_SCRIPT]);

        let path = which::which_in(name, std::env::var_os("PATH"), cwd).map_err(|e| {
            tracing::debug!(interpreter = %name, error = %e, "interpreter lookup failed");
            Error::ProgramNotFound {
                program: name.to_string(),
                command: probe_cmd.to_string(),
                hint: Some(INSTALL_HINT.to_string()),
            }
        })?;

        let probe_cmd = CommandLine::new(path.to_string_lossy()).args(["-c", PROBE_SCRIPT]);
        let info = probe(runner, &probe_cmd, cwd)
            .map_err(|e| e.with_hint(INSTALL_HINT))?
            .ok_or_else(|| Error::Probe {
                command: probe_cmd.to_string(),
                reason: "interpreter exited with an error".to_string(),
            })?;

        tracing::info!(
            path = ?path,
            executable = ?info.executable,
            version = %info.version,
            "resolved Python interpreter"
        );
        Ok(Self { path, info })
    }
}
