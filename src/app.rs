//! Top-level pipeline: configuration, interpreter, provisioning.

use std::path::{Path, PathBuf};

use clap::error::ErrorKind;

use crate::cli::Invocation;
use crate::command::{CommandRunner, SystemRunner};
use crate::config;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::provision::{ProvisionRequest, Provisioner};

/// Crate version reported by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolves the project directory to an absolute, existing path.
pub fn resolve_project_dir(requested: Option<&Path>) -> Result<PathBuf> {
    let dir = match requested {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };

    dir.canonicalize().map_err(|e| {
        Error::Config(format!(
            "project directory {} is not accessible: {}",
            dir.display(),
            e
        ))
    })
}

/// Exit code for command-line parse failures other than `--help`.
pub const USAGE_EXIT_CODE: i32 = 1;

/// Exit code for provisioning and configuration errors.
pub const ERROR_EXIT_CODE: i32 = 1;

/// Returns the exit code for a command-line parse failure.
///
/// `--help` is reported by clap as an error but is a successful exit.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp => 0,
        _ => USAGE_EXIT_CODE,
    }
}

/// Renders a usage error as a single `ERROR:` report, without clap's own
/// `error:` prefix.
pub fn usage_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let message = rendered.trim_start_matches("error: ").trim_end();
    format!("ERROR: {}", message)
}

/// Prints a command-line parse failure and returns the exit code.
pub fn report_usage(err: &clap::Error) -> i32 {
    let code = usage_exit_code(err);
    if code == 0 {
        let _ = err.print();
    } else {
        eprintln!("{}", usage_message(err));
    }
    code
}

/// Prints a terminal error with its hint and returns the exit code.
pub fn report_error(err: &Error) -> i32 {
    eprintln!("ERROR: {}", err);
    if let Some(hint) = err.hint() {
        eprintln!("  hint: {}", hint);
    }
    ERROR_EXIT_CODE
}

/// Runs an invocation against real child processes.
pub fn run(invocation: Invocation) -> Result<i32> {
    run_with(&SystemRunner, invocation)
}

/// Runs an invocation, returning the process exit code.
pub fn run_with<R: CommandRunner>(runner: &R, invocation: Invocation) -> Result<i32> {
    let Invocation { options, command } = invocation;

    if options.version {
        println!("envinit {}", VERSION);
        return Ok(0);
    }

    let project_dir = resolve_project_dir(options.project_dir.as_deref())?;
    let loaded = config::load(&project_dir)?;

    let interpreter = Interpreter::resolve(runner, &loaded.config.python.interpreter, &project_dir)?;
    config::check_python_version(&loaded, &interpreter.info)?;

    let request = ProvisionRequest::new(command)
        .with_clean(options.clean)
        .with_upgrade(options.upgrade);

    let provisioner = Provisioner::new(runner, project_dir, &loaded.config, interpreter);
    let report = provisioner.provision(&request)?;
    Ok(report.exit_code)
}
