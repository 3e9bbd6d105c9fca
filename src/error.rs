//! Error types for environment provisioning.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for provisioning operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An external command ran but exited with a non-zero status.
    #[error("Command '{command}' failed with error code {code}")]
    CommandFailed { command: String, code: i32 },

    /// An external program could not be located on the search path.
    #[error("Program '{program}' not found, command: {command}")]
    ProgramNotFound {
        program: String,
        command: String,
        hint: Option<String>,
    },

    /// The interpreter does not satisfy the configured minimum version.
    #[error("Python version {version} is older than the required {required}, see {}", .config.display())]
    PythonVersion {
        version: String,
        required: String,
        config: PathBuf,
    },

    /// A probe command produced output that could not be understood.
    #[error("unexpected output from '{command}': {reason}")]
    Probe { command: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attaches a remediation hint to a [`Error::ProgramNotFound`].
    ///
    /// Other variants are returned unchanged.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        match self {
            Error::ProgramNotFound {
                program, command, ..
            } => Error::ProgramNotFound {
                program,
                command,
                hint: Some(hint.into()),
            },
            other => other,
        }
    }

    /// Returns the remediation hint, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Error::ProgramNotFound { hint, .. } => hint.as_deref(),
            Error::PythonVersion { .. } => {
                Some("edit python.min_version or point python.interpreter at a newer Python")
            }
            _ => None,
        }
    }
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;
