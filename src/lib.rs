//! envinit - bootstrap a pipenv project environment.
//!
//! This library provides the provisioning pipeline behind the `envinit`
//! binary: it makes sure the project's environment was built with the
//! desired Python interpreter, syncs dependencies, bootstraps the task
//! runner and runs a command inside the environment.

pub mod app;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod manager;
pub mod provision;
pub mod scaffold;

pub use cli::{split_args, Invocation, Options};
pub use command::{Captured, CommandLine, CommandRunner, SystemRunner};
pub use config::{InitConfig, LoadedConfig, Validate, ValidationResult};
pub use error::{Error, Result};
pub use interpreter::{Interpreter, InterpreterInfo, PythonVersion};
pub use manager::EnvManager;
pub use provision::{
    plan, Environment, EnvironmentAction, ProvisionReport, ProvisionRequest, Provisioner,
    RebuildReason,
};
