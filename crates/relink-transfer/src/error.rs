//! # Design
//!
//! - Every failure carries the rendered command so operators can re-run it.
//! - Exit status and captured stderr are fields, never part of the message.

use std::io;

use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors raised while running the transfer program.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The command ran and exited unsuccessfully.
    #[error("transfer command failed")]
    Failed {
        /// Shell-quoted command line.
        command: String,
        /// Exit code; `None` when the process was terminated by a signal.
        status: Option<i32>,
        /// Captured standard error, when it was captured and non-empty.
        stderr: Option<String>,
    },
    /// The command could not be started or awaited.
    #[error("transfer command could not be started")]
    Spawn {
        /// Shell-quoted command line.
        command: String,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl TransferError {
    /// Command line that failed.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Failed { command, .. } | Self::Spawn { command, .. } => command,
        }
    }

    /// Exit status rendered for operators.
    #[must_use]
    pub fn status_label(&self) -> String {
        match self {
            Self::Failed {
                status: Some(code), ..
            } => code.to_string(),
            Self::Failed { status: None, .. } => "signal".to_string(),
            Self::Spawn { source, .. } => source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_label_distinguishes_signals() {
        let failed = TransferError::Failed {
            command: "rsync -rqz".into(),
            status: Some(23),
            stderr: None,
        };
        assert_eq!(failed.status_label(), "23");
        assert_eq!(failed.command(), "rsync -rqz");

        let killed = TransferError::Failed {
            command: "rsync".into(),
            status: None,
            stderr: None,
        };
        assert_eq!(killed.status_label(), "signal");
    }
}
