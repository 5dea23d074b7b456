/// Preflight validation: required tools and required arguments
use tracing::debug;

use crate::cli::Cli;
use crate::config::InstallParams;
use crate::error::InstallError;
use crate::utils::command::CommandRunner;

/// Executables that must be on PATH before anything runs
pub const REQUIRED_TOOLS: &[&str] = &["gcloud", "kubectl", "wget", "tar"];

/// Fail on the first tool missing from the execution path
pub fn check_dependencies(runner: &dyn CommandRunner, tools: &[&str]) -> Result<(), InstallError> {
    for tool in tools {
        match runner.locate(tool) {
            Some(path) => debug!("Found {} at {}", tool, path.display()),
            None => {
                return Err(InstallError::MissingDependency {
                    program: tool.to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Require a non-empty value
pub fn require_argument(value: Option<String>, description: &str) -> Result<String, InstallError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(InstallError::VariableNotDefined {
            description: description.to_string(),
        }),
    }
}

/// Dependencies first, then arguments. Nothing is executed.
pub fn preflight(runner: &dyn CommandRunner, cli: Cli) -> Result<InstallParams, InstallError> {
    check_dependencies(runner, REQUIRED_TOOLS)?;
    cli.into_params()
}
