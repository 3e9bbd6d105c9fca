//! Command-line parsing.
//!
//! Leading tokens that start with `-` are options for envinit itself. The
//! first token that does not start with `-` begins the delegated command,
//! which is passed through verbatim even if later tokens look like flags.

use std::path::PathBuf;

use clap::Parser;

/// Help footer pointing at the files envinit manages.
const AFTER_HELP: &str = "\
Initialize the project by:
  - creating or rebuilding the pipenv environment for the configured Python
  - installing the Pipfile dependencies
  - running the task runner's init task
  - running the provided command inside the environment

Files created when missing: init.toml, Pipfile, invoke.py, tasks.py";

/// Options that precede the delegated command.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "envinit",
    about = "Bootstrap a pipenv project environment and run a command inside it",
    override_usage = "envinit [-h|--help] [-v|--version] [--upgrade] [--clean] [--project-dir=DIR] [command...]",
    after_help = AFTER_HELP,
    disable_version_flag = true
)]
pub struct Options {
    /// Print version information and exit.
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Upgrade locked dependencies to their latest allowed versions.
    #[arg(long)]
    pub upgrade: bool,

    /// Remove the existing environment before provisioning.
    #[arg(long)]
    pub clean: bool,

    /// Project directory to provision (defaults to the current directory).
    #[arg(
        long = "project-dir",
        env = "ENVINIT_PROJECT_DIR",
        value_name = "DIR",
        require_equals = true
    )]
    pub project_dir: Option<PathBuf>,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Options for envinit itself.
    pub options: Options,
    /// Command to run inside the environment (may be empty).
    pub command: Vec<String>,
}

/// Splits arguments into leading options and the trailing command.
///
/// The boundary is the first token that does not start with `-`; that token
/// and everything after it belong to the command.
pub fn split_args<S: AsRef<str>>(args: &[S]) -> (&[S], &[S]) {
    let boundary = args
        .iter()
        .position(|arg| !arg.as_ref().starts_with('-'))
        .unwrap_or(args.len());
    args.split_at(boundary)
}

/// Parses the arguments that follow the program name.
///
/// Returns clap's error for `--help` as well as for usage mistakes; callers
/// decide how to print it (see [`crate::app::report_usage`]).
pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Invocation, clap::Error> {
    let (options, command) = split_args(args);
    let options = Options::try_parse_from(
        std::iter::once("envinit").chain(options.iter().map(AsRef::as_ref)),
    )?;

    Ok(Invocation {
        options,
        command: command.iter().map(|s| s.as_ref().to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_stops_at_first_non_flag() {
        let args = ["--clean", "echo", "--not-ours", "-x"];
        let (options, command) = split_args(&args);
        assert_eq!(options, ["--clean"]);
        assert_eq!(command, ["echo", "--not-ours", "-x"]);
    }

    #[test]
    fn split_args_all_options() {
        let args = ["--clean", "--upgrade"];
        let (options, command) = split_args(&args);
        assert_eq!(options.len(), 2);
        assert!(command.is_empty());
    }

    #[test]
    fn split_args_empty() {
        let args: [&str; 0] = [];
        let (options, command) = split_args(&args);
        assert!(options.is_empty());
        assert!(command.is_empty());
    }

    #[test]
    fn split_args_is_a_prefix_split() {
        let cases: &[&[&str]] = &[
            &["a", "-b", "c"],
            &["-a", "-b"],
            &["-a", "b", "-c", "d"],
            &["", "-a"],
        ];
        for &args in cases {
            let (options, command) = split_args(args);
            let rejoined: Vec<&str> = options.iter().chain(command).copied().collect();
            assert_eq!(rejoined, args.to_vec());
            assert!(options.iter().all(|o| o.starts_with('-')));
            if let Some(first) = command.first() {
                assert!(!first.starts_with('-'));
            }
        }
    }

    #[test]
    fn parse_flags_and_command() {
        let invocation = parse(&["--clean", "--upgrade", "echo", "hi"]).unwrap();
        assert!(invocation.options.clean);
        assert!(invocation.options.upgrade);
        assert!(!invocation.options.version);
        assert_eq!(invocation.command, vec!["echo", "hi"]);
    }

    #[test]
    fn parse_command_flags_are_not_ours() {
        let invocation = parse(&["pytest", "--clean", "-v"]).unwrap();
        assert!(!invocation.options.clean);
        assert!(!invocation.options.version);
        assert_eq!(invocation.command, vec!["pytest", "--clean", "-v"]);
    }

    #[test]
    fn parse_short_version_flag() {
        let invocation = parse(&["-v"]).unwrap();
        assert!(invocation.options.version);
        assert!(invocation.command.is_empty());
    }

    #[test]
    fn parse_help_is_reported_as_display_help() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn parse_rejects_unknown_option() {
        let err = parse(&["--bogus", "echo"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn parse_project_dir_requires_equals() {
        let invocation = parse(&["--project-dir=/tmp/project", "ls"]).unwrap();
        assert_eq!(
            invocation.options.project_dir,
            Some(PathBuf::from("/tmp/project"))
        );
        assert_eq!(invocation.command, vec!["ls"]);

        // Without `=` the value would become the command.
        assert!(parse(&["--project-dir", "/tmp/project"]).is_err());
    }

    #[test]
    fn help_usage_lists_every_option() {
        let err = parse(&["--help"]).unwrap_err();
        let help = err.render().to_string();
        for option in ["--help", "--version", "--upgrade", "--clean", "--project-dir=DIR"] {
            assert!(help.contains(option), "usage is missing {option}:\n{help}");
        }
    }
}
