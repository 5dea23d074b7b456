/// Error taxonomy and process exit codes
use std::io;

/// Process exit codes
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_FAILURE: i32 = 1;
    pub const VARIABLE_NOT_DEFINED: i32 = 3;
    pub const MISSING_DEPENDENCY: i32 = 4;
    pub const ARGUMENT_EVALUATION_ERROR: i32 = 5;
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Required argument not defined: {description}")]
    VariableNotDefined { description: String },

    #[error("Required dependency '{program}' is not installed or not in PATH")]
    MissingDependency { program: String },

    #[error("Failed to evaluate arguments: {0}")]
    ArgumentEvaluation(String),

    #[error("Failed to execute command '{cmd}': {source}")]
    CommandLaunch {
        cmd: String,
        #[source]
        source: io::Error,
    },

    #[error("Command failed with status {}: {cmd}{}", display_code(.code), display_stderr(.stderr))]
    CommandFailed {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Timeout after {secs} seconds: {description}")]
    Timeout { description: String, secs: u64 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

fn display_stderr(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

impl InstallError {
    /// Exit status the process should terminate with for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::VariableNotDefined { .. } => exit::VARIABLE_NOT_DEFINED,
            InstallError::MissingDependency { .. } => exit::MISSING_DEPENDENCY,
            InstallError::ArgumentEvaluation(_) => exit::ARGUMENT_EVALUATION_ERROR,
            // Delegated failures keep the child's own status
            InstallError::CommandFailed { code, .. } => match code {
                Some(code) if *code != exit::SUCCESS => *code,
                _ => exit::GENERAL_FAILURE,
            },
            _ => exit::GENERAL_FAILURE,
        }
    }
}

/// Pick the exit status for an error that reached the top level
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<InstallError>()
        .map(InstallError::exit_code)
        .unwrap_or(exit::GENERAL_FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_validation_exit_codes_are_distinct() {
        let codes = [
            InstallError::VariableNotDefined {
                description: "cluster name".to_string(),
            }
            .exit_code(),
            InstallError::MissingDependency {
                program: "gcloud".to_string(),
            }
            .exit_code(),
            InstallError::ArgumentEvaluation("bad".to_string()).exit_code(),
        ];

        assert_eq!(
            codes,
            [
                exit::VARIABLE_NOT_DEFINED,
                exit::MISSING_DEPENDENCY,
                exit::ARGUMENT_EVALUATION_ERROR
            ]
        );
        assert!(!codes.contains(&exit::SUCCESS));
    }

    #[test]
    fn test_command_failure_propagates_child_status() {
        let err = InstallError::CommandFailed {
            cmd: "kubectl apply -f kiali.yaml".to_string(),
            code: Some(7),
            stderr: "no matches for kind".to_string(),
        };
        assert_eq!(err.exit_code(), 7);
        assert!(err.to_string().contains("no matches for kind"));

        let killed = InstallError::CommandFailed {
            cmd: "istioctl install".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(killed.exit_code(), exit::GENERAL_FAILURE);
        assert!(killed.to_string().ends_with("istioctl install"));
    }

    #[test]
    fn test_exit_code_survives_context() {
        let err = Err::<(), _>(InstallError::MissingDependency {
            program: "wget".to_string(),
        })
        .context("Preflight checks failed")
        .unwrap_err();
        assert_eq!(exit_code_for(&err), exit::MISSING_DEPENDENCY);

        let plain = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&plain), exit::GENERAL_FAILURE);
    }
}
