//! Command execution.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use relink_config::Verbosity;
use tokio::process::Command;
use tracing::{debug, info};

use crate::invocation::Invocation;

/// Outcome of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard error; empty when output was inherited.
    pub stderr: String,
}

impl CommandOutput {
    /// Successful exit with no captured output.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            code: Some(0),
            stderr: String::new(),
        }
    }

    /// Exit with `code` and no captured output.
    #[must_use]
    pub const fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            stderr: String::new(),
        }
    }

    /// Whether the command exited with status zero.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Executes invocations; the seam between the gateway and the OS.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// # Errors
    ///
    /// Returns an error when the process cannot be started or awaited. A
    /// non-zero exit is reported through [`CommandOutput`], not as an error.
    async fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

/// Runs invocations as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    verbosity: Verbosity,
}

impl ProcessRunner {
    /// Runner that discards or inherits child output according to `verbosity`.
    #[must_use]
    pub const fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        debug!(command = %invocation, "running command");
        let mut command = Command::new(invocation.program());
        command.args(invocation.args()).stdin(Stdio::null());

        match self.verbosity {
            Verbosity::Verbose => {
                let status = command
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .await?;
                Ok(CommandOutput {
                    code: status.code(),
                    stderr: String::new(),
                })
            }
            Verbosity::Quiet => {
                let output = command
                    .stdout(Stdio::null())
                    .stderr(Stdio::piped())
                    .output()
                    .await?;
                Ok(CommandOutput {
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
        }
    }
}

/// Logs invocations instead of running them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        info!(command = %invocation, "dry run: command not executed");
        Ok(CommandOutput::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_always_succeeds() -> io::Result<()> {
        let output = DryRunRunner
            .run(&Invocation::new("rsync").arg("--definitely-invalid"))
            .await?;
        assert!(output.succeeded());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn quiet_runner_captures_stderr_and_exit_code() -> io::Result<()> {
        let invocation = Invocation::new("sh")
            .arg("-c")
            .arg("echo out; echo boom >&2; exit 3");
        let output = ProcessRunner::new(Verbosity::Quiet).run(&invocation).await?;
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stderr, "boom");
        assert!(!output.succeeded());
        Ok(())
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let result = ProcessRunner::default()
            .run(&Invocation::new("relink-no-such-program-4b1c"))
            .await;
        assert!(result.is_err());
    }
}
