/// Command execution through a swappable runner
use async_trait::async_trait;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::InstallError;

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result from command execution with captured output
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
    pub success: bool,
}

impl CommandOutput {
    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
            success: output.status.success(),
        }
    }

    /// Return stdout if successful, otherwise a failure carrying the exit status
    pub fn into_result(self, invocation: &Invocation) -> Result<String, InstallError> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(InstallError::CommandFailed {
                cmd: invocation.to_string(),
                code: self.code,
                stderr: self.stderr,
            })
        }
    }
}

/// Executes external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion. Only a failure to spawn is an error.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, InstallError>;

    /// Resolve a program name against the execution path
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

#[async_trait]
impl CommandRunner for TokioRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, InstallError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|source| InstallError::CommandLaunch {
                cmd: invocation.to_string(),
                source,
            })?;

        Ok(CommandOutput::from_output(output))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Builder for external commands
pub struct CommandBuilder {
    invocation: Invocation,
}

impl CommandBuilder {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            invocation: Invocation {
                program: program.as_ref().to_string_lossy().into_owned(),
                args: Vec::new(),
                current_dir: None,
            },
        }
    }

    /// Add a single argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.invocation
            .args
            .push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.invocation.args.extend(
            args.into_iter()
                .map(|arg| arg.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Run the command from this directory
    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.invocation.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Execute and return raw output
    pub async fn output(self, runner: &dyn CommandRunner) -> Result<CommandOutput, InstallError> {
        debug!("Running: {}", self.invocation);
        runner.run(&self.invocation).await
    }

    /// Execute and return stdout on success, error on failure
    pub async fn run(self, runner: &dyn CommandRunner) -> Result<String, InstallError> {
        debug!("Running: {}", self.invocation);
        let output = runner.run(&self.invocation).await?;
        if !output.stdout.trim().is_empty() {
            debug!("{}", output.stdout.trim());
        }
        output.into_result(&self.invocation)
    }

    /// Execute and ignore output (just check success)
    pub async fn run_silent(self, runner: &dyn CommandRunner) -> Result<(), InstallError> {
        self.run(runner).await.map(|_| ())
    }
}
