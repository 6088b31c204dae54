//! # Design
//!
//! - One taxonomy for everything that can stop a provisioning run; crate
//!   errors are wrapped with the operation that raised them.
//! - Messages are constant. Operator text comes from a per-variant template
//!   with `{placeholder}` slots filled from [`ProvisionError::context`].
//! - Validation and safety failures are distinguishable from operational
//!   ones so the CLI can pick an exit code.

use relink_core::{CoreError, HostingError};
use relink_fsops::FsOpsError;
use relink_transfer::TransferError;
use thiserror::Error;

/// Result alias for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Failures that stop a provisioning run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The target environment is protected.
    #[error("environment is protected")]
    EnvironmentProtected {
        /// Environment named by the request.
        env: String,
    },
    /// The request was malformed.
    #[error("invalid provisioning request")]
    InvalidRequest {
        /// Validation failure.
        #[from]
        source: CoreError,
    },
    /// The site or environment could not be resolved.
    #[error("site lookup failed")]
    SiteLookup {
        /// Hosting API failure.
        source: HostingError,
    },
    /// The environment could not be switched to the direct-write mode.
    #[error("connection mode switch failed")]
    ConnectionModeSwitch {
        /// Environment being switched.
        env: String,
        /// Last message reported by the platform.
        message: String,
    },
    /// A transfer command failed.
    #[error("transfer failed")]
    Transfer {
        /// Operation identifier.
        operation: &'static str,
        /// Transfer failure.
        source: TransferError,
    },
    /// Local staging failed.
    #[error("staging failed")]
    Staging {
        /// Operation identifier.
        operation: &'static str,
        /// Filesystem failure.
        source: FsOpsError,
    },
}

impl ProvisionError {
    pub(crate) const fn transfer(operation: &'static str, source: TransferError) -> Self {
        Self::Transfer { operation, source }
    }

    pub(crate) const fn staging(operation: &'static str, source: FsOpsError) -> Self {
        Self::Staging { operation, source }
    }

    /// Operator message template with `{name}` placeholders.
    #[must_use]
    pub const fn template(&self) -> &'static str {
        match self {
            Self::EnvironmentProtected { .. } => {
                "Symlinks cannot be provisioned on the protected '{env}' environment; use a development or multidev environment."
            }
            Self::InvalidRequest { .. } => "Invalid request value '{value}': {reason}.",
            Self::SiteLookup { .. } => "Could not resolve the site environment: {detail}.",
            Self::ConnectionModeSwitch { .. } => {
                "Could not switch '{env}' to a writable connection mode: {message}."
            }
            Self::Transfer {
                source: TransferError::Failed { .. },
                ..
            } => "Step '{operation}' failed with exit status {status}: {command}",
            Self::Transfer {
                source: TransferError::Spawn { .. },
                ..
            } => "Step '{operation}' could not start '{command}': {status}",
            Self::Staging { .. } => "Local staging step '{operation}' failed: {detail}",
        }
    }

    /// Values substituted into [`ProvisionError::template`].
    #[must_use]
    pub fn context(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::EnvironmentProtected { env } => vec![("env", env.clone())],
            Self::InvalidRequest { source } => vec![
                ("value", source.value().to_string()),
                ("reason", source.reason().to_string()),
            ],
            Self::SiteLookup { source } => vec![("detail", source.detail())],
            Self::ConnectionModeSwitch { env, message } => {
                vec![("env", env.clone()), ("message", message.clone())]
            }
            Self::Transfer { operation, source } => vec![
                ("operation", (*operation).to_string()),
                ("command", source.command().to_string()),
                ("status", source.status_label()),
            ],
            Self::Staging { operation, source } => vec![
                ("operation", (*operation).to_string()),
                ("detail", source.detail()),
            ],
        }
    }

    /// Template with every placeholder replaced.
    #[must_use]
    pub fn render(&self) -> String {
        self.context()
            .into_iter()
            .fold(self.template().to_string(), |text, (key, value)| {
                text.replace(&format!("{{{key}}}"), &value)
            })
    }

    /// Whether the failure stems from the request itself or a safety rule
    /// rather than from a remote or local operation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EnvironmentProtected { .. } | Self::InvalidRequest { .. }
        )
    }
}
