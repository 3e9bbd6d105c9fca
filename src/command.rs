//! Child process execution.
//!
//! Every external program goes through a [`CommandRunner`], so provisioning
//! can be driven against a scripted runner in tests. The helpers in this
//! module turn raw process results into [`Error::CommandFailed`] and
//! [`Error::ProgramNotFound`].

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{Error, Result};

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CommandLine {
    /// Creates a command line for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable for the child only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Returns the program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments (without the program).
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Returns the extra environment variables.
    pub fn environment(&self) -> &[(String, String)] {
        &self.envs
    }
}

fn quote(part: &str) -> Cow<'_, str> {
    if part.is_empty() {
        return Cow::Borrowed("\"\"");
    }
    if part.chars().any(|c| c.is_whitespace() || c == '"') {
        return Cow::Owned(format!("\"{}\"", part.replace('"', "\\\"")));
    }
    Cow::Borrowed(part)
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Captured result of a command whose stdout was collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// Exit code of the process.
    pub code: i32,
    /// Everything the process wrote to stdout.
    pub stdout: String,
}

impl Captured {
    /// Returns true if the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Converts a non-zero exit into [`Error::CommandFailed`].
    pub fn check(self, command: &CommandLine) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                code: self.code,
            })
        }
    }
}

/// Executes external programs on behalf of the provisioner.
pub trait CommandRunner {
    /// Runs the command with inherited stdio and returns its exit code.
    fn status(&self, command: &CommandLine, cwd: &Path) -> io::Result<i32>;

    /// Runs the command, capturing stdout while stderr stays attached to
    /// the terminal.
    fn output(&self, command: &CommandLine, cwd: &Path) -> io::Result<Captured>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn status(&self, command: &CommandLine, cwd: &Path) -> io::Result<i32> {
        (**self).status(command, cwd)
    }

    fn output(&self, command: &CommandLine, cwd: &Path) -> io::Result<Captured> {
        (**self).output(command, cwd)
    }
}

/// Runner backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn status(&self, command: &CommandLine, cwd: &Path) -> io::Result<i32> {
        let status = Command::new(command.program())
            .args(command.arguments())
            .envs(command.environment().iter().map(|(k, v)| (k, v)))
            .current_dir(cwd)
            .status()?;
        Ok(exit_code(status))
    }

    fn output(&self, command: &CommandLine, cwd: &Path) -> io::Result<Captured> {
        let output = Command::new(command.program())
            .args(command.arguments())
            .envs(command.environment().iter().map(|(k, v)| (k, v)))
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()?;
        Ok(Captured {
            code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// Maps an exit status to a shell-style exit code.
///
/// Processes killed by a signal report `128 + signal` on Unix.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Converts a spawn failure into a crate error.
pub fn spawn_error(err: io::Error, command: &CommandLine) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::ProgramNotFound {
            program: command.program().to_string(),
            command: command.to_string(),
            hint: None,
        }
    } else {
        Error::Io(err)
    }
}

/// Echoes and runs a command, failing on a non-zero exit.
pub fn run<R: CommandRunner + ?Sized>(runner: &R, command: &CommandLine, cwd: &Path) -> Result<()> {
    let code = run_unchecked(runner, command, cwd)?;
    if code != 0 {
        return Err(Error::CommandFailed {
            command: command.to_string(),
            code,
        });
    }
    Ok(())
}

/// Echoes and runs a command, returning its exit code whatever it is.
pub fn run_unchecked<R: CommandRunner + ?Sized>(
    runner: &R,
    command: &CommandLine,
    cwd: &Path,
) -> Result<i32> {
    println!("$ {}", command);
    tracing::debug!(command = %command, cwd = ?cwd, "running command");
    runner
        .status(command, cwd)
        .map_err(|e| spawn_error(e, command))
}

/// Runs a command and captures its stdout without judging the exit code.
pub fn capture<R: CommandRunner + ?Sized>(
    runner: &R,
    command: &CommandLine,
    cwd: &Path,
) -> Result<Captured> {
    tracing::debug!(command = %command, cwd = ?cwd, "capturing command output");
    runner
        .output(command, cwd)
        .map_err(|e| spawn_error(e, command))
}
